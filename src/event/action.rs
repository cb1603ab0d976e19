//! One-shot actions: events whose activation *is* the work.
//!
//! [`OneShotAction`] adapts an [`ActionPayload`] into a hook set with
//! [`ActivationPolicy::Immediate`]: the payload runs when the record
//! activates, and the record is forced to expired in the same pass
//! whether the payload succeeded or not. There is no lingering activated
//! phase and no expire hooks. Recurrence composes on top: a recurring
//! action record runs its payload once per life.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clock::SettleContext;
use crate::error::BoxError;
use crate::event::hooks::{ActivationPolicy, TransitionHooks};
use crate::event::record::EventRecord;

/// The work a one-shot action performs at activation.
#[async_trait]
pub trait ActionPayload: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "action"
    }

    /// Runs the payload. The record snapshot shows the freshly activated
    /// state.
    ///
    /// # Errors
    ///
    /// Any error is surfaced from the settlement call as a hook failure;
    /// the record expires regardless.
    async fn run(&self, record: &EventRecord, ctx: &SettleContext<'_>) -> Result<(), BoxError>;
}

/// Hook set that fires a payload exactly once per activation.
pub struct OneShotAction {
    payload: Box<dyn ActionPayload>,
    /// Guards against duplicate dispatch while the payload is running.
    in_flight: AtomicBool,
}

impl OneShotAction {
    /// Wraps a payload.
    #[must_use]
    pub fn new(payload: Box<dyn ActionPayload>) -> Self {
        Self {
            payload,
            in_flight: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TransitionHooks for OneShotAction {
    fn name(&self) -> &'static str {
        "one_shot_action"
    }

    fn activation_policy(&self) -> ActivationPolicy {
        ActivationPolicy::Immediate
    }

    async fn on_activate(
        &self,
        record: &EventRecord,
        ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(
                id = %record.id,
                action = self.payload.name(),
                "payload already in flight; duplicate dispatch skipped"
            );
            return Ok(());
        }

        let result = self.payload.run(record, ctx).await;
        self.in_flight.store(false, Ordering::SeqCst);

        if let Err(error) = &result {
            warn!(
                id = %record.id,
                action = self.payload.name(),
                error = %error,
                "action payload failed"
            );
        }
        result
    }
}

impl std::fmt::Debug for OneShotAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneShotAction")
            .field("payload", &self.payload.name())
            .finish_non_exhaustive()
    }
}
