//! The settlement engine: a timed event and the pass loop that catches it
//! up to the current world time.
//!
//! # Architecture
//!
//! - One [`TimedEvent`] wraps one [`EventRecord`] behind a mutex, plus the
//!   hook set and a pair of coalescing flags
//! - [`TimedEvent::settle`] is the only driver: it loops "stamp the
//!   current phase's boundary, check whether it is due, apply at most one
//!   transition" until the record rests
//! - Overlapping settle calls coalesce: one caller drains, late arrivals
//!   mark `run_again` and return, and the draining caller runs exactly
//!   one more full pass per mark
//! - The record lock is never held across an await; hooks get an
//!   immutable snapshot of the record, never the live copy

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::clock::{SettleContext, WorldTime};
use crate::error::{BoxError, LifecycleError};
use crate::event::hooks::{ActivationPolicy, Gate, HookPoint, NoopHooks, TransitionHooks};
use crate::event::record::{EventId, EventRecord, LifecycleState, Repeat, Schedule};
use crate::event::recurrence::{self, Recurrence, StopReason};

// ============================================================================
// TimedEvent
// ============================================================================

/// A lifecycle-managed event: persisted record, hook set, and settlement
/// state.
///
/// The record inside is authoritative. Hosts read it through
/// [`snapshot`](Self::snapshot) and move it only through
/// [`settle`](Self::settle) and [`activate`](Self::activate); there is no
/// mutable access from outside the engine.
pub struct TimedEvent {
    /// Cached copy of the record id for lock-free log fields.
    id: EventId,
    record: Mutex<EventRecord>,
    hooks: Box<dyn TransitionHooks>,
    /// Set while a settlement call is draining the event.
    running: AtomicBool,
    /// Set by callers that arrived while `running` was held.
    run_again: AtomicBool,
}

impl TimedEvent {
    /// Wraps a record with no-op hooks.
    #[must_use]
    pub fn new(record: EventRecord) -> Self {
        Self::with_hooks(record, Box::new(NoopHooks))
    }

    /// Wraps a record with the given hook set.
    ///
    /// The record may be freshly built or restored mid-lifecycle from
    /// persistence; settlement resumes from whatever state it carries.
    #[must_use]
    pub fn with_hooks(record: EventRecord, hooks: Box<dyn TransitionHooks>) -> Self {
        let id = record.id.clone();
        Self {
            id,
            record: Mutex::new(record),
            hooks,
            running: AtomicBool::new(false),
            run_again: AtomicBool::new(false),
        }
    }

    /// Returns the event's id.
    #[must_use]
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Returns the current lifecycle state.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.with_record(|record| record.state)
    }

    /// Returns a point-in-time copy of the record.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> EventRecord {
        self.with_record(|record| record.clone())
    }

    /// Unwraps the event back into its record, for persistence.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn into_record(self) -> EventRecord {
        self.record.into_inner().expect("event record lock poisoned")
    }

    /// Seconds until the current phase's boundary arrives, clamped at
    /// zero once it is due.
    ///
    /// Returns `None` when the boundary is unstamped, parked behind a
    /// manual gate or missing duration, or the record is expired.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn remaining_secs(&self, now: WorldTime) -> Option<i64> {
        self.with_record(|record| {
            let boundary = match record.state {
                LifecycleState::Created => record.initiation.at,
                LifecycleState::Initiated => record.activation.at,
                LifecycleState::Activated => record.expiration.at,
                LifecycleState::Expired => Schedule::Never,
            };
            boundary
                .at()
                .map(|at| at.as_secs().saturating_sub(now.as_secs()).max(0))
        })
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Catches the record up to the clock's current time.
    ///
    /// Applies every transition whose boundary has arrived, in order,
    /// re-reading the clock before each one. Calling this is always safe:
    /// a record with nothing due is left untouched, and calling twice at
    /// the same instant is a no-op the second time.
    ///
    /// If another call is already settling this event, this call marks
    /// the event for one more full pass and returns immediately; the
    /// in-flight call picks the mark up before releasing. No request is
    /// ever silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Hook`] when a transition hook fails. The
    /// record keeps every state change applied before the failure and the
    /// next call resumes from there.
    pub async fn settle(&self, ctx: &SettleContext<'_>) -> Result<(), LifecycleError> {
        if !self.try_begin() {
            self.run_again.store(true, Ordering::SeqCst);
            // The draining call may have released between our failed
            // acquire and the mark; re-acquire so the mark is never
            // stranded.
            if !self.try_begin() {
                debug!(id = %self.id, "settlement already in flight; coalesced");
                return Ok(());
            }
        }
        self.drive(ctx).await
    }

    /// Opens the manual activation gate and settles.
    ///
    /// Stamps the activation boundary to the current instant and
    /// immediately drives the record through it, which may cascade all
    /// the way to expiration if the duration has already elapsed by the
    /// clock's reckoning.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotInitiated`] when the record is not in
    /// the initiated state, and any error the triggered settlement
    /// raises.
    pub async fn activate(&self, ctx: &SettleContext<'_>) -> Result<(), LifecycleError> {
        let now = ctx.now();
        self.with_record(|record| {
            if record.state == LifecycleState::Initiated {
                record.activation.at = Schedule::At(now);
                Ok(())
            } else {
                Err(LifecycleError::NotInitiated {
                    id: record.id.clone(),
                    state: record.state,
                })
            }
        })?;
        debug!(id = %self.id, at = now.as_secs(), "manual activation gate opened");
        self.settle(ctx).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Runs the record lock around `f`.
    ///
    /// Callers must not await while the closure runs; everything the
    /// hooks see is a clone taken inside this helper.
    fn with_record<T>(&self, f: impl FnOnce(&mut EventRecord) -> T) -> T {
        let mut record = self.record.lock().expect("event record lock poisoned");
        f(&mut record)
    }

    fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Drains the event: runs passes until no re-run mark is left, then
    /// releases the running flag.
    async fn drive(&self, ctx: &SettleContext<'_>) -> Result<(), LifecycleError> {
        loop {
            loop {
                self.run_again.store(false, Ordering::SeqCst);
                if let Err(error) = self.run_pass(ctx).await {
                    // Release before propagating; a pending mark is
                    // picked up by whichever call settles next.
                    self.running.store(false, Ordering::SeqCst);
                    return Err(error);
                }
                if !self.run_again.load(Ordering::SeqCst) {
                    break;
                }
                debug!(id = %self.id, "re-running settlement for a coalesced request");
            }
            self.running.store(false, Ordering::SeqCst);
            // A mark that landed between the check above and the release
            // would be stranded; re-acquire and drain it ourselves.
            if !(self.run_again.load(Ordering::SeqCst) && self.try_begin()) {
                return Ok(());
            }
        }
    }

    /// One full settlement pass: applies due transitions until the
    /// record rests for the current clock reading.
    async fn run_pass(&self, ctx: &SettleContext<'_>) -> Result<(), LifecycleError> {
        let mut last_rearm_anchor: Option<WorldTime> = None;

        loop {
            let now = ctx.now();
            let snapshot = self.with_record(|record| {
                record.stamp_phase_schedule(now);
                record.clone()
            });

            match snapshot.state {
                LifecycleState::Created => {
                    if !snapshot.initiation.at.is_due(now) {
                        break;
                    }
                    let verdict = self
                        .hooks
                        .pre_initiate(&snapshot, ctx)
                        .await
                        .map_err(|source| self.hook_error(HookPoint::PreInitiate, source))?;
                    if verdict == Gate::Hold {
                        debug!(id = %self.id, "initiation held by pre-hook");
                        break;
                    }
                    if !self.advance(LifecycleState::Created, LifecycleState::Initiated, now) {
                        break;
                    }
                    let after = self.snapshot();
                    self.hooks
                        .on_initiate(&after, ctx)
                        .await
                        .map_err(|source| self.hook_error(HookPoint::OnInitiate, source))?;
                }
                LifecycleState::Initiated => {
                    if snapshot.activation.at.is_never() {
                        debug!(id = %self.id, "holding for manual activation");
                        break;
                    }
                    if !snapshot.activation.at.is_due(now) {
                        break;
                    }
                    let verdict = self
                        .hooks
                        .pre_activate(&snapshot, ctx)
                        .await
                        .map_err(|source| self.hook_error(HookPoint::PreActivate, source))?;
                    if verdict == Gate::Hold {
                        debug!(id = %self.id, "activation held by pre-hook");
                        break;
                    }
                    if !self.advance(LifecycleState::Initiated, LifecycleState::Activated, now) {
                        break;
                    }
                    let after = self.snapshot();
                    let activated = self.hooks.on_activate(&after, ctx).await;
                    if self.hooks.activation_policy() == ActivationPolicy::Immediate {
                        // Forced expiration happens whether or not the
                        // hook succeeded, and skips pre_expire/on_expire.
                        let at = ctx.now();
                        self.with_record(|record| record.force_expire(at));
                        info!(
                            id = %self.id,
                            at = at.as_secs(),
                            "expired immediately after activation"
                        );
                    }
                    activated.map_err(|source| self.hook_error(HookPoint::OnActivate, source))?;
                }
                LifecycleState::Activated => {
                    if !snapshot.expiration.at.is_due(now) {
                        break;
                    }
                    let verdict = self
                        .hooks
                        .pre_expire(&snapshot, ctx)
                        .await
                        .map_err(|source| self.hook_error(HookPoint::PreExpire, source))?;
                    if verdict == Gate::Hold {
                        debug!(id = %self.id, "expiration held by pre-hook");
                        break;
                    }
                    if !self.advance(LifecycleState::Activated, LifecycleState::Expired, now) {
                        break;
                    }
                    let after = self.snapshot();
                    self.hooks
                        .on_expire(&after, ctx)
                        .await
                        .map_err(|source| self.hook_error(HookPoint::OnExpire, source))?;
                }
                LifecycleState::Expired => match recurrence::evaluate(&snapshot, now) {
                    Recurrence::Rearm { anchor, repeat_left } => {
                        if repeat_left == Repeat::Unbounded && last_rearm_anchor == Some(anchor) {
                            // An immediate-activation hook set can force
                            // a cycle down to zero seconds at runtime;
                            // catch the loop the static check cannot see.
                            warn!(
                                id = %self.id,
                                at = anchor.as_secs(),
                                "unbounded recurrence is not advancing; staying expired"
                            );
                            break;
                        }
                        last_rearm_anchor = Some(anchor);
                        self.with_record(|record| record.rearm(anchor, repeat_left));
                        info!(
                            id = %self.id,
                            anchor = anchor.as_secs(),
                            repeat = ?repeat_left,
                            "re-armed for another life"
                        );
                    }
                    Recurrence::Stop { reason, repeat_left } => {
                        self.with_record(|record| record.expiration.repeat = repeat_left);
                        if reason == StopReason::ZeroSpanCycle {
                            warn!(
                                id = %self.id,
                                "unbounded recurrence with a zero-length cycle; staying expired"
                            );
                        } else {
                            debug!(id = %self.id, reason = ?reason, "recurrence stopped");
                        }
                        break;
                    }
                },
            }
        }

        Ok(())
    }

    /// Applies one transition if the record is still where the pass left
    /// it. A `false` return means the state moved underneath us; the
    /// pass loop re-reads and carries on.
    fn advance(&self, from: LifecycleState, to: LifecycleState, now: WorldTime) -> bool {
        let advanced = self.with_record(|record| record.try_advance(from, to));
        if advanced {
            info!(
                id = %self.id,
                from = %from,
                to = %to,
                at = now.as_secs(),
                "event state advanced"
            );
        } else {
            debug!(id = %self.id, from = %from, to = %to, "advance refused; state changed");
        }
        advanced
    }

    fn hook_error(&self, point: HookPoint, source: BoxError) -> LifecycleError {
        warn!(id = %self.id, hook = %point, error = %source, "transition hook failed");
        LifecycleError::Hook {
            id: self.id.clone(),
            point,
            source,
        }
    }
}

impl std::fmt::Debug for TimedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedEvent")
            .field("id", &self.id)
            .field("hooks", &self.hooks.name())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Batch settlement
// ============================================================================

/// Settles every event in the collection, in order.
///
/// One failing event never stops the sweep: its error is collected with
/// its id and the remaining events still settle. An empty return means
/// the whole collection settled cleanly.
pub async fn settle_all<'a, I>(
    events: I,
    ctx: &SettleContext<'_>,
) -> Vec<(EventId, LifecycleError)>
where
    I: IntoIterator<Item = &'a TimedEvent>,
{
    let mut failures = Vec::new();
    for event in events {
        if let Err(error) = event.settle(ctx).await {
            warn!(id = %event.id(), error = %error, "settlement failed; sweep continues");
            failures.push((event.id().clone(), error));
        }
    }
    failures
}
