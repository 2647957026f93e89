//! Time-Axis Reconstructor
//!
//! Scan mode samples the video output once per sequencer tick, so sample `i`
//! of a trace sits at tick `i` of a readout program repeated back to back.
//! This module maps sample indices onto (cycle, phase, tick) positions.

use std::sync::Arc;

use serde::Serialize;

use crate::sequence::SequenceProgram;

/// Position of one sample within the repeating clock sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisPoint<'a> {
    /// Index of the sample in its trace
    pub sample_index: usize,
    /// Readout cycle the sample falls in (0-based)
    pub cycle: u64,
    /// Index of the active interval within the program
    pub interval: usize,
    /// Name of the active interval
    pub phase_name: &'a str,
    /// Ticks elapsed since the start of the trace
    pub elapsed_ticks: u64,
    /// Tick offset within the current cycle
    pub tick_in_cycle: u64,
}

/// Map each of `trace_len` samples onto the clock sequence.
///
/// Returns exactly `trace_len` points. Intervals are walked cyclically and a
/// zero-duration interval never becomes active. A program with no ticks at
/// all has no phases to report; every point then carries an empty phase name
/// and stays in cycle 0.
pub fn build_axis(program: &SequenceProgram, trace_len: usize) -> Vec<AxisPoint<'_>> {
    let mut points = Vec::with_capacity(trace_len);
    if program.total_ticks() == 0 {
        points.extend((0..trace_len).map(|i| AxisPoint {
            sample_index: i,
            cycle: 0,
            interval: 0,
            phase_name: "",
            elapsed_ticks: i as u64,
            tick_in_cycle: 0,
        }));
        return points;
    }

    let mut cycle = 0u64;
    while points.len() < trace_len {
        let mut tick_in_cycle = 0u64;
        for (interval, slice) in program.intervals.iter().enumerate() {
            for _ in 0..slice.duration_ticks {
                if points.len() == trace_len {
                    return points;
                }
                let sample_index = points.len();
                points.push(AxisPoint {
                    sample_index,
                    cycle,
                    interval,
                    phase_name: &slice.name,
                    elapsed_ticks: sample_index as u64,
                    tick_in_cycle,
                });
                tick_in_cycle += 1;
            }
        }
        cycle += 1;
    }
    points
}

/// The incomplete readout cycle at the end of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialCycle {
    /// Samples in the partial cycle
    pub samples: usize,
    /// Phases the partial cycle reaches, in order
    pub phases: Vec<String>,
}

/// Contiguous run of samples spent in one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpan<'a> {
    /// Interval index within the program
    pub interval: usize,
    /// Interval name
    pub name: &'a str,
    /// Readout cycle
    pub cycle: u64,
    /// First sample of the run
    pub start: usize,
    /// One past the last sample of the run
    pub end: usize,
}

/// Compact time axis of one trace.
///
/// Either backed by a clock-sequence program, in which case positions are
/// expressed in readout cycles, or a plain sample index.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    program: Option<Arc<SequenceProgram>>,
    len: usize,
}

impl TimeAxis {
    /// Axis in sample units, with no clock sequence.
    pub fn sample_index(len: usize) -> Self {
        Self { program: None, len }
    }

    /// Axis reconstructed from a clock-sequence program.
    pub fn from_sequence(program: Arc<SequenceProgram>, len: usize) -> Self {
        Self {
            program: Some(program),
            len,
        }
    }

    /// Number of samples on the axis
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the axis has no samples
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Program backing the axis, if any
    pub fn program(&self) -> Option<&Arc<SequenceProgram>> {
        self.program.as_ref()
    }

    /// Ticks per readout cycle, when sequence-backed and non-degenerate.
    pub fn cycle_ticks(&self) -> Option<u64> {
        self.program
            .as_ref()
            .map(|p| p.total_ticks())
            .filter(|&t| t > 0)
    }

    /// Whether two axes are interchangeable for plotting: same length and the
    /// same program (or both sample-indexed).
    pub fn same_as(&self, other: &TimeAxis) -> bool {
        self.len == other.len
            && match (&self.program, &other.program) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
                _ => false,
            }
    }

    /// Sequence position of sample `index`.
    pub fn point(&self, index: usize) -> Option<AxisPoint<'_>> {
        if index >= self.len {
            return None;
        }
        let program = self.program.as_deref()?;
        let cycle_ticks = program.total_ticks();
        if cycle_ticks == 0 {
            return None;
        }
        let elapsed = index as u64;
        let tick_in_cycle = elapsed % cycle_ticks;
        let interval = program.interval_at(tick_in_cycle)?;
        Some(AxisPoint {
            sample_index: index,
            cycle: elapsed / cycle_ticks,
            interval,
            phase_name: &program.intervals[interval].name,
            elapsed_ticks: elapsed,
            tick_in_cycle,
        })
    }

    /// All points of a sequence-backed axis. Empty for a sample-index axis.
    pub fn points(&self) -> Vec<AxisPoint<'_>> {
        match self.program.as_deref() {
            Some(program) => build_axis(program, self.len),
            None => Vec::new(),
        }
    }

    /// Plot coordinate of sample `index`: `cycle + tick_in_cycle / cycle_ticks`
    /// for a sequence axis, the sample index otherwise.
    pub fn position(&self, index: usize) -> f64 {
        match self.cycle_ticks() {
            Some(cycle_ticks) => index as f64 / cycle_ticks as f64,
            None => index as f64,
        }
    }

    /// Plot coordinates of every sample.
    pub fn positions(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.position(i)).collect()
    }

    /// Label of the axis unit.
    pub fn unit(&self) -> &'static str {
        if self.cycle_ticks().is_some() {
            "readout cycle"
        } else {
            "sample"
        }
    }

    /// Number of complete readout cycles covered.
    pub fn full_cycles(&self) -> u64 {
        self.cycle_ticks()
            .map(|cycle_ticks| self.len as u64 / cycle_ticks)
            .unwrap_or(0)
    }

    /// The trailing incomplete cycle, if the trace stops mid-cycle.
    pub fn partial_cycle(&self) -> Option<PartialCycle> {
        let program = self.program.as_deref()?;
        let cycle_ticks = self.cycle_ticks()?;
        let samples = (self.len as u64 % cycle_ticks) as usize;
        if samples == 0 {
            return None;
        }
        let mut phases = Vec::new();
        let mut start = 0u64;
        for slice in &program.intervals {
            if start >= samples as u64 {
                break;
            }
            if slice.duration_ticks > 0 {
                phases.push(slice.name.clone());
            }
            start += slice.duration_ticks;
        }
        Some(PartialCycle { samples, phases })
    }

    /// Runs of consecutive samples within one interval, in sample order.
    ///
    /// Zero-duration intervals produce no span. Empty for a sample-index axis.
    pub fn phase_spans(&self) -> Vec<PhaseSpan<'_>> {
        let mut spans = Vec::new();
        let Some(program) = self.program.as_deref() else {
            return spans;
        };
        if program.total_ticks() == 0 {
            return spans;
        }
        let mut start = 0usize;
        let mut cycle = 0u64;
        while start < self.len {
            for (interval, slice) in program.intervals.iter().enumerate() {
                if start >= self.len {
                    break;
                }
                if slice.duration_ticks == 0 {
                    continue;
                }
                let end = (start as u64 + slice.duration_ticks).min(self.len as u64) as usize;
                spans.push(PhaseSpan {
                    interval,
                    name: &slice.name,
                    cycle,
                    start,
                    end,
                });
                start = end;
            }
            cycle += 1;
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Interval;
    use std::collections::BTreeMap;

    fn program(durations: &[(&str, u64)]) -> SequenceProgram {
        SequenceProgram {
            name: "ReadPixel".to_string(),
            clocks: vec!["RG".to_string()],
            intervals: durations
                .iter()
                .enumerate()
                .map(|(i, &(name, duration_ticks))| Interval {
                    name: name.to_string(),
                    duration_ticks,
                    levels: BTreeMap::from([("RG".to_string(), (i % 2) as u8)]),
                })
                .collect(),
            tick_period_ns: 10.0,
        }
    }

    #[test]
    fn test_build_axis_walks_intervals_cyclically() {
        let p = program(&[("Reset", 2), ("Signal", 3)]);
        let points = build_axis(&p, 12);
        assert_eq!(points.len(), 12);

        let names: Vec<&str> = points.iter().map(|p| p.phase_name).collect();
        assert_eq!(
            names,
            [
                "Reset", "Reset", "Signal", "Signal", "Signal", "Reset", "Reset", "Signal",
                "Signal", "Signal", "Reset", "Reset"
            ]
        );
        assert_eq!(points[5].cycle, 1);
        assert_eq!(points[5].tick_in_cycle, 0);
        assert_eq!(points[11].elapsed_ticks, 11);
        assert_eq!(points[11].cycle, 2);
    }

    #[test]
    fn test_zero_duration_interval_never_active() {
        let p = program(&[("A", 2), ("Skip", 0), ("B", 1)]);
        let points = build_axis(&p, 9);
        assert!(points.iter().all(|pt| pt.phase_name != "Skip"));

        let axis = TimeAxis::from_sequence(Arc::new(p.clone()), 9);
        for pt in &points {
            assert_eq!(axis.point(pt.sample_index).as_ref(), Some(pt));
        }
        assert!(axis.phase_spans().iter().all(|s| s.name != "Skip"));
    }

    #[test]
    fn test_build_axis_empty_trace() {
        let p = program(&[("A", 4)]);
        assert!(build_axis(&p, 0).is_empty());
    }

    #[test]
    fn test_partial_cycle_names_reached_phases() {
        let p = Arc::new(program(&[("Reset", 20), ("Pedestal", 30), ("Signal", 5), ("Dump", 2)]));
        // three full cycles of 57 ticks, then 40 ticks into the fourth
        let axis = TimeAxis::from_sequence(p.clone(), 57 * 3 + 40);
        assert_eq!(axis.full_cycles(), 3);
        assert_eq!(
            axis.partial_cycle(),
            Some(PartialCycle {
                samples: 40,
                phases: vec!["Reset".to_string(), "Pedestal".to_string()],
            })
        );

        let whole = TimeAxis::from_sequence(p, 57 * 2);
        assert_eq!(whole.full_cycles(), 2);
        assert_eq!(whole.partial_cycle(), None);
    }

    #[test]
    fn test_position_in_cycles() {
        let p = Arc::new(program(&[("A", 3), ("B", 1)]));
        let axis = TimeAxis::from_sequence(p, 10);
        assert_eq!(axis.position(0), 0.0);
        assert_eq!(axis.position(2), 0.5);
        assert_eq!(axis.position(6), 1.5);
        assert_eq!(axis.unit(), "readout cycle");

        let plain = TimeAxis::sample_index(10);
        assert_eq!(plain.position(6), 6.0);
        assert_eq!(plain.unit(), "sample");
        assert!(plain.points().is_empty());
        assert_eq!(plain.partial_cycle(), None);
    }

    #[test]
    fn test_phase_spans_cover_axis() {
        let p = Arc::new(program(&[("A", 3), ("B", 2)]));
        let axis = TimeAxis::from_sequence(p, 12);
        let spans = axis.phase_spans();
        assert_eq!(spans.first().map(|s| s.start), Some(0));
        assert_eq!(spans.last().map(|s| s.end), Some(12));
        assert!(spans.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(spans.len(), 5);
        assert_eq!(spans[4].name, "A");
        assert_eq!(spans[4].cycle, 2);
    }

    #[test]
    fn test_same_as() {
        let p = Arc::new(program(&[("A", 3)]));
        let a = TimeAxis::from_sequence(p.clone(), 9);
        let b = TimeAxis::from_sequence(Arc::new(program(&[("A", 3)])), 9);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&TimeAxis::from_sequence(p, 6)));
        assert!(!a.same_as(&TimeAxis::sample_index(9)));
    }
}
