use std::collections::BTreeMap;

use serde::Serialize;

/// Default sequencer tick period (REB FPGA clock).
pub const DEFAULT_TICK_PERIOD_NS: f64 = 10.0;

/// Longest slice or readout cycle a sequencer file may describe, in ticks.
pub const MAX_CYCLE_TICKS: u64 = 1 << 40;

/// One named slice of a readout function: a duration with fixed logic levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interval {
    /// Slice name (constant name, or `<function>.<index>` for literal durations)
    pub name: String,
    /// Duration in sequencer ticks
    pub duration_ticks: u64,
    /// Logic level (0/1) of each clock line during the slice
    pub levels: BTreeMap<String, u8>,
}

impl Interval {
    /// Level of a clock line during this slice, if the line is driven.
    pub fn level(&self, clock: &str) -> Option<u8> {
        self.levels.get(clock).copied()
    }
}

/// A parsed readout function: the ordered intervals of one readout cycle.
///
/// Immutable once parsed. Shared read-only (usually behind an `Arc`) by every
/// time axis built from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceProgram {
    /// Function name the program was taken from
    pub name: String,
    /// Clock lines driven by the program, in declaration order
    pub clocks: Vec<String>,
    /// Intervals in execution order
    pub intervals: Vec<Interval>,
    /// Duration of one tick in nanoseconds
    pub tick_period_ns: f64,
}

impl SequenceProgram {
    /// Ticks in one full readout cycle, saturating at `u64::MAX`.
    pub fn total_ticks(&self) -> u64 {
        self.intervals
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.duration_ticks))
    }

    /// Duration of one readout cycle in nanoseconds.
    pub fn cycle_ns(&self) -> f64 {
        self.total_ticks() as f64 * self.tick_period_ns
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the program has no intervals.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Exclusive end tick of each interval within a cycle.
    pub fn interval_ends(&self) -> Vec<u64> {
        self.intervals
            .iter()
            .scan(0u64, |acc, interval| {
                *acc = acc.saturating_add(interval.duration_ticks);
                Some(*acc)
            })
            .collect()
    }

    /// Index of the interval active at `tick_in_cycle`.
    ///
    /// Zero-length intervals are never active. Returns `None` when the tick is
    /// beyond the end of the cycle.
    pub fn interval_at(&self, tick_in_cycle: u64) -> Option<usize> {
        let ends = self.interval_ends();
        let idx = ends.partition_point(|&end| end <= tick_in_cycle);
        (idx < self.intervals.len()).then_some(idx)
    }
}
