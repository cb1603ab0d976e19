//! World-clock time and the injectable clock abstraction.
//!
//! All scheduling in this crate runs on *world time*: whole seconds on the
//! host simulation's own clock, represented by [`WorldTime`]. The engine
//! never reads wall-clock time and never sleeps. The host decides what
//! "now" is by handing a [`WorldClock`] to every settlement call through a
//! [`SettleContext`], which makes time fully scriptable in tests: freeze
//! it, step it forward, or jump it backward after a correction.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// WorldTime
// ============================================================================

/// An instant on the simulation's world clock, in whole seconds.
///
/// The zero point is whatever the host says it is (world creation, session
/// start, save-file epoch). Arithmetic saturates instead of wrapping so a
/// hostile or corrupted schedule cannot overflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorldTime(i64);

impl WorldTime {
    /// The clock's zero point.
    pub const ZERO: Self = Self(0);

    /// Creates an instant from whole seconds since the world epoch.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the instant as whole seconds since the world epoch.
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// Returns this instant shifted by `secs`, saturating at the clock's
    /// representable bounds.
    #[must_use]
    pub const fn plus_secs(self, secs: i64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Returns `true` if this instant is at or before `now`.
    ///
    /// This is the single due-check used by the settlement engine: an
    /// instant in the past *or* the present has arrived.
    #[must_use]
    pub const fn has_arrived(self, now: Self) -> bool {
        self.0 <= now.0
    }
}

impl std::fmt::Display for WorldTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

// ============================================================================
// WorldClock
// ============================================================================

/// Source of the current world time.
///
/// Implementations must be cheap to query; the settlement engine re-reads
/// the clock at the top of every pass iteration so that hook suspensions
/// observe clock movement that happened while they were parked.
pub trait WorldClock: Send + Sync {
    /// Returns the current world time.
    fn now(&self) -> WorldTime;
}

/// A frozen clock. Useful for single-instant assertions in tests.
impl WorldClock for WorldTime {
    fn now(&self) -> WorldTime {
        *self
    }
}

/// A manually stepped clock backed by an atomic instant.
///
/// This is the reference clock for tests and turn-based hosts: time stands
/// still until somebody calls [`set`](Self::set) or
/// [`advance`](Self::advance). It is safe to share across tasks.
#[derive(Debug, Default)]
pub struct StepClock {
    now_secs: AtomicI64,
}

impl StepClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: WorldTime) -> Self {
        Self {
            now_secs: AtomicI64::new(start.as_secs()),
        }
    }

    /// Moves the clock to `now`. Backward moves are allowed; the
    /// settlement engine treats them as corrections and holds state.
    pub fn set(&self, now: WorldTime) {
        self.now_secs.store(now.as_secs(), Ordering::SeqCst);
    }

    /// Steps the clock by `secs` (which may be negative) and returns the
    /// new current time. Saturates at the clock's representable bounds.
    pub fn advance(&self, secs: i64) -> WorldTime {
        let mut current = self.now_secs.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(secs);
            match self.now_secs.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return WorldTime::from_secs(next),
                Err(observed) => current = observed,
            }
        }
    }
}

impl WorldClock for StepClock {
    fn now(&self) -> WorldTime {
        WorldTime::from_secs(self.now_secs.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SettleContext
// ============================================================================

/// Per-call context handed to [`TimedEvent::settle`] and on to every
/// transition hook.
///
/// Carries the injected clock. It is deliberately small and `Copy`: build
/// one next to the clock and reuse it for every call.
///
/// [`TimedEvent::settle`]: crate::event::TimedEvent::settle
#[derive(Clone, Copy)]
pub struct SettleContext<'a> {
    clock: &'a dyn WorldClock,
}

impl<'a> SettleContext<'a> {
    /// Creates a context around the given clock.
    #[must_use]
    pub fn new(clock: &'a dyn WorldClock) -> Self {
        Self { clock }
    }

    /// Reads the current world time from the injected clock.
    #[must_use]
    pub fn now(&self) -> WorldTime {
        self.clock.now()
    }
}

impl std::fmt::Debug for SettleContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettleContext")
            .field("now", &self.now())
            .finish_non_exhaustive()
    }
}
