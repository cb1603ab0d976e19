//! Event lifecycle: records, settlement, hooks, and one-shot actions.
//!
//! # Architecture
//!
//! - [`record`] - the persisted [`EventRecord`] with its per-phase
//!   schedules; plain data, no behavior
//! - [`engine`] - [`TimedEvent`], the settlement driver that moves a
//!   record forward whenever the host hands it the clock
//! - [`hooks`] - the [`TransitionHooks`] seam for observing and vetoing
//!   transitions
//! - `recurrence` - pure re-arm decisions for expired records
//! - [`action`] - [`OneShotAction`], the fire-and-expire specialization
//!
//! # Design
//!
//! - Time only moves when the host says so; there are no background
//!   tasks and no wall-clock reads
//! - Scheduled instants are stamped once and never recomputed, so a
//!   clock that jumps backward holds state instead of regressing it
//! - Settlement is re-entrant and idempotent; concurrent calls coalesce
//!   into at most one extra pass

pub mod action;
pub mod engine;
pub mod hooks;
pub mod record;
mod recurrence;

pub use action::{ActionPayload, OneShotAction};
pub use engine::{TimedEvent, settle_all};
pub use hooks::{ActivationPolicy, Gate, HookPoint, NoopHooks, TransitionHooks};
pub use record::{
    Activation, EventBuilder, EventId, EventRecord, Expiration, Initiation, LifecycleState,
    OwnerRef, Repeat, Schedule,
};
