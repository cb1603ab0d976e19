//! The persisted event record: identity, lifecycle state, and per-phase
//! schedules.
//!
//! An [`EventRecord`] is plain data. It owns no clock, spawns nothing, and
//! is exactly what a host serializes into a save file. All movement through
//! the lifecycle happens in the settlement engine
//! ([`TimedEvent`](crate::event::TimedEvent)), which mutates the record
//! through the crate-private helpers at the bottom of this module.
//!
//! Scheduled instants are stamped once and then left alone: each phase
//! boundary (`initiation.at`, `activation.at`, `expiration.at`) starts out
//! [`Schedule::Unscheduled`] and is fixed to a concrete [`WorldTime`] the
//! first time the engine needs it. Re-settling never recomputes a stamped
//! instant, so records survive clock corrections without drifting.

use serde::{Deserialize, Serialize};

use crate::clock::WorldTime;
use crate::error::BuildError;

// ============================================================================
// Identity newtypes
// ============================================================================

/// Stable identifier of an event record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wraps a raw id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to the world entity an event belongs to.
///
/// The engine never interprets this; it is carried for the host and for
/// log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerRef(String);

impl OwnerRef {
    /// Wraps a raw owner reference string.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self(owner.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Lifecycle state
// ============================================================================

/// The four lifecycle states, in forward order.
///
/// Within one life of a record the state only ever moves forward. The sole
/// sanctioned regression is the recurrence re-arm from `Expired` back to
/// `Created`, which starts a new life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Armed and waiting for its initiation instant.
    #[default]
    Created,
    /// Visible to the world, waiting for activation.
    Initiated,
    /// In effect, waiting for expiration (if any).
    Activated,
    /// Finished. Terminal unless recurrence re-arms the record.
    Expired,
}

impl LifecycleState {
    /// Returns the state's lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initiated => "initiated",
            Self::Activated => "activated",
            Self::Expired => "expired",
        }
    }

    /// Returns the only state this one may advance to, or `None` from the
    /// terminal state.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Initiated),
            Self::Initiated => Some(Self::Activated),
            Self::Activated => Some(Self::Expired),
            Self::Expired => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Schedules
// ============================================================================

/// A phase boundary's scheduled instant.
///
/// `Unscheduled` means "not computed yet"; the engine stamps it on demand.
/// `Never` means the boundary will not arrive on its own: a manual
/// activation gate, or an expiration with no duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "time", rename_all = "snake_case")]
pub enum Schedule {
    /// Not stamped yet.
    #[default]
    Unscheduled,
    /// Fixed to a concrete instant.
    At(WorldTime),
    /// Will never arrive without outside intervention.
    Never,
}

impl Schedule {
    /// Returns the stamped instant, if there is one.
    #[must_use]
    pub const fn at(self) -> Option<WorldTime> {
        match self {
            Self::At(time) => Some(time),
            Self::Unscheduled | Self::Never => None,
        }
    }

    /// Returns `true` if the boundary has not been stamped.
    #[must_use]
    pub const fn is_unscheduled(self) -> bool {
        matches!(self, Self::Unscheduled)
    }

    /// Returns `true` if the boundary is parked behind outside
    /// intervention.
    #[must_use]
    pub const fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }

    /// Returns `true` if the boundary is stamped and its instant is at or
    /// before `now`.
    #[must_use]
    pub const fn is_due(self, now: WorldTime) -> bool {
        match self {
            Self::At(time) => time.has_arrived(now),
            Self::Unscheduled | Self::Never => false,
        }
    }
}

/// How many more times a record re-arms after expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum Repeat {
    /// No recurrence: expiration is final.
    #[default]
    None,
    /// A bounded number of remaining lives. `Count(0)` behaves like
    /// `None`.
    Count(u32),
    /// Re-arms forever (or until `repeat_until` cuts it off).
    Unbounded,
}

// ============================================================================
// Phase records
// ============================================================================

/// Schedule for the created -> initiated boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Initiation {
    /// Seconds after the arming reference before the event initiates.
    #[serde(default)]
    pub delay: i64,

    /// The stamped initiation instant.
    #[serde(default)]
    pub at: Schedule,
}

/// Schedule for the initiated -> activated boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Activation {
    /// If `true`, the event never activates on its own; the boundary is
    /// stamped [`Schedule::Never`] and only
    /// [`TimedEvent::activate`](crate::event::TimedEvent::activate) opens
    /// it.
    #[serde(default)]
    pub manual_trigger: bool,

    /// Seconds after initiation before the event activates.
    #[serde(default)]
    pub delay: i64,

    /// The stamped activation instant.
    #[serde(default)]
    pub at: Schedule,
}

/// Schedule for the activated -> expired boundary, plus recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expiration {
    /// Seconds after activation before the event expires. `None` means
    /// the event stays activated until forced out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,

    /// The stamped expiration instant.
    #[serde(default)]
    pub at: Schedule,

    /// Remaining recurrence budget.
    #[serde(default)]
    pub repeat: Repeat,

    /// Hard stop for recurrence: once this instant is past or present at
    /// expiration time, the record stops re-arming regardless of the
    /// remaining budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_until: Option<WorldTime>,
}

// ============================================================================
// EventRecord
// ============================================================================

/// The full persisted state of one timed event.
///
/// Build fresh records through [`EventRecord::builder`]; deserialize
/// persisted ones directly. A record restored mid-lifecycle (for example
/// `activated` with its boundaries already stamped) resumes exactly where
/// it left off once it is wrapped in a
/// [`TimedEvent`](crate::event::TimedEvent) and settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable identifier.
    pub id: EventId,

    /// Human-readable title, resolved once at build time.
    #[serde(default)]
    pub title: String,

    /// The world entity this event belongs to.
    pub owner: OwnerRef,

    /// Current lifecycle state.
    #[serde(default)]
    pub state: LifecycleState,

    /// The arming reference instant the initiation delay counts from.
    ///
    /// Stamped at build time when the builder is given one, otherwise
    /// lazily from the clock on the first settlement pass. Recurrence
    /// re-stamps it to the expiration instant of the previous life.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armed_at: Option<WorldTime>,

    /// Created -> initiated schedule.
    #[serde(default)]
    pub initiation: Initiation,

    /// Initiated -> activated schedule.
    #[serde(default)]
    pub activation: Activation,

    /// Activated -> expired schedule and recurrence.
    #[serde(default)]
    pub expiration: Expiration,
}

impl EventRecord {
    /// Starts building a record with the given id.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> EventBuilder {
        EventBuilder::new(id)
    }

    // ------------------------------------------------------------------
    // Engine-side mutators. Callers hold the record lock.
    // ------------------------------------------------------------------

    /// Advances `from -> to` if the record is currently in `from` and `to`
    /// is its legal successor. Returns `false` without touching the record
    /// otherwise.
    pub(crate) fn try_advance(&mut self, from: LifecycleState, to: LifecycleState) -> bool {
        if self.state == from && from.successor() == Some(to) {
            self.state = to;
            true
        } else {
            false
        }
    }

    /// Stamps the current phase's boundary if it has not been stamped yet.
    ///
    /// Each boundary anchors on the previous one: initiation on the arming
    /// reference, activation on the initiation instant, expiration on the
    /// activation instant. A record restored without its earlier instants
    /// falls back to the arming reference and finally to `now`.
    pub(crate) fn stamp_phase_schedule(&mut self, now: WorldTime) {
        match self.state {
            LifecycleState::Created => {
                if self.initiation.at.is_unscheduled() {
                    let anchor = *self.armed_at.get_or_insert(now);
                    self.initiation.at = Schedule::At(anchor.plus_secs(self.initiation.delay));
                }
            }
            LifecycleState::Initiated => {
                if self.activation.at.is_unscheduled() {
                    self.activation.at = if self.activation.manual_trigger {
                        Schedule::Never
                    } else {
                        let anchor = self
                            .initiation
                            .at
                            .at()
                            .or(self.armed_at)
                            .unwrap_or(now);
                        Schedule::At(anchor.plus_secs(self.activation.delay))
                    };
                }
            }
            LifecycleState::Activated => {
                if self.expiration.at.is_unscheduled() {
                    self.expiration.at = match self.expiration.duration {
                        None => Schedule::Never,
                        Some(duration) => {
                            let anchor = self
                                .activation
                                .at
                                .at()
                                .or_else(|| self.initiation.at.at())
                                .or(self.armed_at)
                                .unwrap_or(now);
                            Schedule::At(anchor.plus_secs(duration))
                        }
                    };
                }
            }
            LifecycleState::Expired => {}
        }
    }

    /// Re-arms an expired record for another life.
    ///
    /// The new life anchors on `anchor` (the previous life's expiration
    /// instant), not on the current clock, so a late settlement keeps the
    /// cadence instead of drifting.
    pub(crate) fn rearm(&mut self, anchor: WorldTime, repeat_left: Repeat) {
        self.state = LifecycleState::Created;
        self.armed_at = Some(anchor);
        self.initiation.at = Schedule::At(anchor.plus_secs(self.initiation.delay));
        self.activation.at = Schedule::Unscheduled;
        self.expiration.at = Schedule::Unscheduled;
        self.expiration.repeat = repeat_left;
    }

    /// Forces the record into `Expired` at `now`, overwriting whatever
    /// the expiration boundary held. Used by immediate-activation hooks.
    pub(crate) fn force_expire(&mut self, now: WorldTime) {
        self.state = LifecycleState::Expired;
        self.expiration.at = Schedule::At(now);
    }
}

// ============================================================================
// EventBuilder
// ============================================================================

/// Builder for fresh [`EventRecord`]s.
///
/// Validation happens in [`build`](Self::build): ids must be non-empty, an
/// owner is required, and all delays and durations must be zero or
/// positive. Setting [`repeat_until`](Self::repeat_until) without an
/// explicit repeat budget upgrades the budget to [`Repeat::Unbounded`],
/// since a cutoff on a record that never repeats would be dead weight.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    id: String,
    title: Option<String>,
    owner: Option<String>,
    armed_at: Option<WorldTime>,
    initiation_delay: i64,
    manual_trigger: bool,
    activation_delay: i64,
    duration: Option<i64>,
    repeat: Repeat,
    repeat_until: Option<WorldTime>,
}

impl EventBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            owner: None,
            armed_at: None,
            initiation_delay: 0,
            manual_trigger: false,
            activation_delay: 0,
            duration: None,
            repeat: Repeat::None,
            repeat_until: None,
        }
    }

    /// Sets the human-readable title. Defaults to the id.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the owning world entity.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Fixes the arming reference instant the initiation delay counts
    /// from. Without this, the first settlement pass stamps it from the
    /// clock.
    #[must_use]
    pub const fn armed_at(mut self, at: WorldTime) -> Self {
        self.armed_at = Some(at);
        self
    }

    /// Seconds between the arming reference and initiation.
    #[must_use]
    pub const fn initiation_delay(mut self, secs: i64) -> Self {
        self.initiation_delay = secs;
        self
    }

    /// Seconds between initiation and activation.
    #[must_use]
    pub const fn activation_delay(mut self, secs: i64) -> Self {
        self.activation_delay = secs;
        self
    }

    /// Parks the activation boundary behind
    /// [`TimedEvent::activate`](crate::event::TimedEvent::activate).
    #[must_use]
    pub const fn manual_trigger(mut self) -> Self {
        self.manual_trigger = true;
        self
    }

    /// Seconds the event stays activated before expiring. Without a
    /// duration the event never expires on its own.
    #[must_use]
    pub const fn duration(mut self, secs: i64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Sets the recurrence budget.
    #[must_use]
    pub const fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Sets the recurrence cutoff instant.
    #[must_use]
    pub const fn repeat_until(mut self, at: WorldTime) -> Self {
        self.repeat_until = Some(at);
        self
    }

    /// Validates the definition and produces the record in
    /// [`LifecycleState::Created`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::EmptyId`] for a blank id,
    /// [`BuildError::MissingOwner`] when no owner was supplied, and
    /// [`BuildError::InvalidSeconds`] for any negative delay or duration.
    pub fn build(self) -> Result<EventRecord, BuildError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(BuildError::EmptyId);
        }

        let owner = match self.owner.as_deref().map(str::trim) {
            Some(owner) if !owner.is_empty() => owner.to_string(),
            _ => {
                return Err(BuildError::MissingOwner { id: id.to_string() });
            }
        };

        for (field, value) in [
            ("initiation_delay", Some(self.initiation_delay)),
            ("activation_delay", Some(self.activation_delay)),
            ("duration", self.duration),
        ] {
            if let Some(value) = value
                && value < 0
            {
                return Err(BuildError::InvalidSeconds {
                    id: id.to_string(),
                    field,
                    value,
                });
            }
        }

        let repeat = if self.repeat == Repeat::None && self.repeat_until.is_some() {
            Repeat::Unbounded
        } else {
            self.repeat
        };

        Ok(EventRecord {
            id: EventId::new(id),
            title: self.title.unwrap_or_else(|| id.to_string()),
            owner: OwnerRef::new(owner),
            state: LifecycleState::Created,
            armed_at: self.armed_at,
            initiation: Initiation {
                delay: self.initiation_delay,
                at: Schedule::Unscheduled,
            },
            activation: Activation {
                manual_trigger: self.manual_trigger,
                delay: self.activation_delay,
                at: Schedule::Unscheduled,
            },
            expiration: Expiration {
                duration: self.duration,
                at: Schedule::Unscheduled,
                repeat,
                repeat_until: self.repeat_until,
            },
        })
    }
}
