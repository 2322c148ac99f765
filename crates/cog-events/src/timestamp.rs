//! Simulation Timestamp Types
//!
//! Simulation time is a discrete tick counter plus a per-tick sequence
//! number. The pair gives every event a total order that is stable across
//! replays: events are compared by (tick, sequence), never by insertion
//! order or wall clock.
//!
//! # Example
//!
//! ```
//! use cog_events::SimTimestamp;
//!
//! let a = SimTimestamp::new(100, 3);
//! let b = SimTimestamp::new(100, 4);
//! assert!(a < b);
//! assert_eq!(a.to_string(), "tick_100.seq_3");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in simulation time: the tick plus the deterministic sequence
/// number of the event within that tick.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTimestamp {
    /// Discrete simulation time step.
    pub tick: u64,
    /// Position within the tick's commit batch.
    pub sequence: u64,
}

impl SimTimestamp {
    /// Creates a timestamp from a tick and an intra-tick sequence number.
    pub fn new(tick: u64, sequence: u64) -> Self {
        Self { tick, sequence }
    }

    /// The first timestamp of a tick.
    pub fn start_of(tick: u64) -> Self {
        Self { tick, sequence: 0 }
    }

    /// Returns the timestamp of the next event in the same tick.
    pub fn next(self) -> Self {
        Self {
            tick: self.tick,
            sequence: self.sequence + 1,
        }
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick_{}.seq_{}", self.tick, self.sequence)
    }
}

/// Formats an event ID from a monotonically increasing counter.
pub fn format_event_id(counter: u64) -> String {
    format!("evt_{:08}", counter)
}

/// Formats a snapshot ID from a sequence number.
pub fn format_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_order_by_tick_then_sequence() {
        let early = SimTimestamp::new(5, 90);
        let late = SimTimestamp::new(6, 0);
        assert!(early < late);
        assert!(SimTimestamp::new(6, 1) > late);
    }

    #[test]
    fn next_increments_sequence_only() {
        let ts = SimTimestamp::new(12, 7).next();
        assert_eq!(ts, SimTimestamp::new(12, 8));
    }

    #[test]
    fn id_formats_are_zero_padded() {
        assert_eq!(format_event_id(317), "evt_00000317");
        assert_eq!(format_snapshot_id(2), "snap_000002");
    }
}
