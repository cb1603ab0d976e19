//! Eventide is a lifecycle engine for game events that live on a simulated
//! world clock.
//!
//! An event moves through four states: created, initiated, activated, and
//! expired. Nothing in this crate spawns timers or reads wall-clock time.
//! Instead the host hands a [`clock::WorldClock`] to every settlement call
//! and the engine catches each record up to wherever the clock says "now"
//! is, firing the transitions whose scheduled instants have arrived.
//!
//! # Architecture
//!
//! - [`clock`] - world-time instants, the injectable clock trait, and the
//!   settlement context passed through the engine
//! - [`event`] - the persisted event record, the settlement engine, the
//!   transition hook trait, and the one-shot action specialization
//! - [`error`] - construction and lifecycle error types
//!
//! # Example
//!
//! ```
//! use eventide::clock::{SettleContext, StepClock, WorldTime};
//! use eventide::event::{EventRecord, LifecycleState, TimedEvent};
//!
//! # tokio_test::block_on(async {
//! let record = EventRecord::builder("festival")
//!     .owner("region:7")
//!     .armed_at(WorldTime::ZERO)
//!     .activation_delay(10)
//!     .duration(30)
//!     .build()?;
//! let event = TimedEvent::new(record);
//!
//! let clock = StepClock::new(WorldTime::ZERO);
//! let ctx = SettleContext::new(&clock);
//!
//! clock.set(WorldTime::from_secs(12));
//! event.settle(&ctx).await?;
//! assert_eq!(event.state(), LifecycleState::Activated);
//!
//! clock.set(WorldTime::from_secs(40));
//! event.settle(&ctx).await?;
//! assert_eq!(event.state(), LifecycleState::Expired);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod clock;
pub mod error;
pub mod event;
