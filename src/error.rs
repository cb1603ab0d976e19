//! Error types for event construction and settlement.
//!
//! Two failure families are kept apart on purpose: [`BuildError`] covers
//! rejected record definitions and can only surface while building, while
//! [`LifecycleError`] covers runtime protocol violations and hook failures
//! raised during settlement or manual activation.

use thiserror::Error;

use crate::event::hooks::HookPoint;
use crate::event::record::{EventId, LifecycleState};

/// Boxed error type carried out of transition hooks and action payloads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building an [`EventRecord`](crate::event::EventRecord).
///
/// Construction validates eagerly so that a record which exists is a record
/// the settlement engine can always drive.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The record id was empty or whitespace-only.
    #[error("Event id must not be empty")]
    EmptyId,

    /// No owner reference was supplied.
    #[error("Event '{id}' has no owner reference")]
    MissingOwner {
        /// Id of the offending record.
        id: String,
    },

    /// A delay or duration was negative.
    #[error("Event '{id}' has invalid {field}: {value} (must be >= 0 seconds)")]
    InvalidSeconds {
        /// Id of the offending record.
        id: String,
        /// Name of the rejected field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },
}

/// Errors raised while settling or manually activating a
/// [`TimedEvent`](crate::event::TimedEvent).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Manual activation was requested outside the initiated state.
    #[error("Event '{id}' cannot be activated from state '{state}' (must be initiated)")]
    NotInitiated {
        /// Id of the event.
        id: EventId,
        /// State the event was actually in.
        state: LifecycleState,
    },

    /// A transition hook or action payload failed.
    ///
    /// The transition the hook was attached to has already been applied
    /// when an `on_*` hook fails; `pre_*` hooks fail before any state
    /// change.
    #[error("Event '{id}' hook '{point}' failed")]
    Hook {
        /// Id of the event.
        id: EventId,
        /// Which hook raised the error.
        point: HookPoint,
        /// The underlying hook error.
        #[source]
        source: BoxError,
    },
}
