//! Transition hooks: the extension seam of the settlement engine.
//!
//! Every lifecycle boundary exposes a pre/on pair. The `pre_*` hook runs
//! before the transition and may veto it for this pass by returning
//! [`Gate::Hold`]; the `on_*` hook runs after the state change has been
//! applied. Hooks receive an immutable snapshot of the record plus the
//! settlement context, never the live record, so a suspended hook cannot
//! hold the engine's lock.
//!
//! All hooks default to no-ops that let the lifecycle run on schedule.
//! Implementations override only the boundaries they care about.

use async_trait::async_trait;

use crate::clock::SettleContext;
use crate::error::BoxError;
use crate::event::record::EventRecord;

// ============================================================================
// Hook vocabulary
// ============================================================================

/// Verdict of a `pre_*` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Apply the transition.
    Proceed,
    /// Skip the transition for this pass. Not an error; the next
    /// settlement asks again.
    Hold,
}

/// How the activated phase ends for this hook set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationPolicy {
    /// Expiration follows the record's duration schedule.
    #[default]
    Scheduled,
    /// The event expires in the same pass that activated it, as soon as
    /// `on_activate` returns. Used by one-shot actions.
    Immediate,
}

/// Identifies which hook raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before created -> initiated.
    PreInitiate,
    /// After created -> initiated.
    OnInitiate,
    /// Before initiated -> activated.
    PreActivate,
    /// After initiated -> activated.
    OnActivate,
    /// Before activated -> expired.
    PreExpire,
    /// After activated -> expired.
    OnExpire,
}

impl HookPoint {
    /// Returns the hook point's snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreInitiate => "pre_initiate",
            Self::OnInitiate => "on_initiate",
            Self::PreActivate => "pre_activate",
            Self::OnActivate => "on_activate",
            Self::PreExpire => "pre_expire",
            Self::OnExpire => "on_expire",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransitionHooks
// ============================================================================

/// Observer and veto surface for lifecycle transitions.
///
/// A hook error aborts the current settlement call with
/// [`LifecycleError::Hook`](crate::error::LifecycleError::Hook); the
/// record keeps whatever state it had already reached, and the next
/// settlement resumes from there.
#[async_trait]
pub trait TransitionHooks: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "hooks"
    }

    /// How the activated phase ends. Defaults to the record's schedule.
    fn activation_policy(&self) -> ActivationPolicy {
        ActivationPolicy::Scheduled
    }

    /// Runs before created -> initiated.
    async fn pre_initiate(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        Ok(Gate::Proceed)
    }

    /// Runs after created -> initiated.
    async fn on_initiate(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs before initiated -> activated.
    async fn pre_activate(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        Ok(Gate::Proceed)
    }

    /// Runs after initiated -> activated.
    async fn on_activate(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs before activated -> expired. Not consulted when an
    /// [`ActivationPolicy::Immediate`] hook set forces expiration.
    async fn pre_expire(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<Gate, BoxError> {
        Ok(Gate::Proceed)
    }

    /// Runs after activated -> expired.
    async fn on_expire(
        &self,
        _record: &EventRecord,
        _ctx: &SettleContext<'_>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Hook set that observes nothing and vetoes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

#[async_trait]
impl TransitionHooks for NoopHooks {
    fn name(&self) -> &'static str {
        "noop"
    }
}
