//! Recurrence evaluation for expired records.
//!
//! Pure decision logic: given an expired record and the current world
//! time, decide whether it re-arms for another life or stays down, and
//! what recurrence budget it keeps either way. The settlement engine
//! applies the outcome; nothing in this module mutates.
//!
//! The cutoff always wins: once `repeat_until` is past or present, the
//! record stops with its remaining budget untouched. Otherwise a bounded
//! budget pays one life per expiration and stops at zero.

use crate::clock::WorldTime;
use crate::event::record::{EventRecord, Repeat};

/// Outcome of evaluating recurrence on an expired record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Recurrence {
    /// Start another life, anchored on the previous life's expiration
    /// instant.
    Rearm {
        /// Arming reference for the new life.
        anchor: WorldTime,
        /// Budget to store on the record.
        repeat_left: Repeat,
    },
    /// Stay expired.
    Stop {
        /// Why the record stays down.
        reason: StopReason,
        /// Budget to store on the record.
        repeat_left: Repeat,
    },
}

/// Why an expired record did not re-arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// The record carries no recurrence at all.
    NotRequested,
    /// `repeat_until` is past or present.
    CutoffReached,
    /// The bounded budget ran out.
    CountExhausted,
    /// An unbounded record whose whole cycle takes zero seconds would
    /// re-arm forever at one instant.
    ZeroSpanCycle,
}

/// Decides what an expired record does next.
pub(crate) fn evaluate(record: &EventRecord, now: WorldTime) -> Recurrence {
    let repeat = record.expiration.repeat;

    if let Some(cutoff) = record.expiration.repeat_until
        && cutoff.has_arrived(now)
    {
        // Stop before touching the budget: a restored record keeps an
        // accurate count of lives it never got to spend.
        return Recurrence::Stop {
            reason: StopReason::CutoffReached,
            repeat_left: repeat,
        };
    }

    // Re-arm relative to where the life actually ended, not to the
    // clock, so late settlement keeps the cadence.
    let anchor = record.expiration.at.at().unwrap_or(now);

    match repeat {
        Repeat::None => Recurrence::Stop {
            reason: StopReason::NotRequested,
            repeat_left: Repeat::None,
        },
        Repeat::Count(lives) => {
            let left = lives.saturating_sub(1);
            if left == 0 {
                Recurrence::Stop {
                    reason: StopReason::CountExhausted,
                    repeat_left: Repeat::Count(0),
                }
            } else {
                Recurrence::Rearm {
                    anchor,
                    repeat_left: Repeat::Count(left),
                }
            }
        }
        Repeat::Unbounded => {
            if is_zero_span(record) {
                Recurrence::Stop {
                    reason: StopReason::ZeroSpanCycle,
                    repeat_left: Repeat::Unbounded,
                }
            } else {
                Recurrence::Rearm {
                    anchor,
                    repeat_left: Repeat::Unbounded,
                }
            }
        }
    }
}

/// A cycle with no delays, no manual gate, and a zero duration completes
/// in zero world seconds.
fn is_zero_span(record: &EventRecord) -> bool {
    !record.activation.manual_trigger
        && record.initiation.delay == 0
        && record.activation.delay == 0
        && record.expiration.duration == Some(0)
}
