//! Property-based tests for time-axis reconstruction and alignment

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use raftscope::align::{align, AlignOptions, AxisBasis, Normalization};
use raftscope::axis::{build_axis, TimeAxis};
use raftscope::container::{ContainerFormat, ReadoutMode};
use raftscope::sequence::{Interval, SequenceProgram};
use raftscope::{ChannelTrace, SourceId, TraceMetadata};

// ============================================================================
// Helper Functions
// ============================================================================

fn program(ticks: &[u64]) -> SequenceProgram {
    SequenceProgram {
        name: "ReadPixel".to_string(),
        clocks: vec!["RG".to_string(), "S1".to_string()],
        intervals: ticks
            .iter()
            .enumerate()
            .map(|(i, &duration_ticks)| Interval {
                name: format!("slice{}", i),
                duration_ticks,
                levels: BTreeMap::from([
                    ("RG".to_string(), (i % 2) as u8),
                    ("S1".to_string(), ((i + 1) % 2) as u8),
                ]),
            })
            .collect(),
        tick_period_ns: 10.0,
    }
}

fn trace(name: &str, len: usize) -> ChannelTrace {
    ChannelTrace {
        source: SourceId::new(format!("{}.fits", name), 0),
        samples: (0..len).map(|i| ((i * 7) % 13) as f64).collect(),
        channel: 0,
        ccd: None,
        metadata: TraceMetadata {
            format: ContainerFormat::Fits,
            readout_mode: ReadoutMode::Scan,
            sample_period_ns: Some(10.0),
            sequence_name: None,
            date_obs: None,
        },
    }
}

fn durations() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..40, 1..6)
}

// ============================================================================
// Time axis
// ============================================================================

proptest! {
    /// One axis point per sample, with ticks advancing one per sample
    #[test]
    fn test_axis_covers_every_sample(ticks in durations(), len in 0usize..2000) {
        let program = program(&ticks);
        let cycle = program.total_ticks();
        let points = build_axis(&program, len);

        prop_assert_eq!(points.len(), len);
        for (i, point) in points.iter().enumerate() {
            prop_assert_eq!(point.sample_index, i);
            prop_assert_eq!(point.elapsed_ticks, i as u64);
            prop_assert_eq!(point.cycle, i as u64 / cycle);
            prop_assert_eq!(point.tick_in_cycle, i as u64 % cycle);
            prop_assert_eq!(point.phase_name, program.intervals[point.interval].name.as_str());
        }
    }

    /// The active interval only ever advances within a cycle
    #[test]
    fn test_axis_phase_order(ticks in durations(), cycles in 1usize..5) {
        let program = program(&ticks);
        let len = cycles * program.total_ticks() as usize;
        let points = build_axis(&program, len);

        for pair in points.windows(2) {
            if pair[0].cycle == pair[1].cycle {
                prop_assert!(pair[0].interval <= pair[1].interval);
            } else {
                prop_assert_eq!(pair[1].interval, 0);
            }
        }
        let axis = TimeAxis::from_sequence(Arc::new(program.clone()), len);
        prop_assert_eq!(axis.full_cycles(), cycles as u64);
        prop_assert!(axis.partial_cycle().is_none());
    }
}

// ============================================================================
// Alignment
// ============================================================================

proptest! {
    /// Every member ends with the same number of readout cycles, whatever the input order
    #[test]
    fn test_alignment_order_independent(
        a_ticks in durations(),
        b_ticks in durations(),
        a_len in 1usize..3000,
        b_len in 1usize..3000,
    ) {
        let a = Arc::new(program(&a_ticks));
        let b = Arc::new(program(&b_ticks));
        let options = AlignOptions::default();

        let forward = align(
            vec![trace("a", a_len), trace("b", b_len)],
            AxisBasis::PerTraceSequence(vec![Arc::clone(&a), Arc::clone(&b)]),
            &options,
        ).unwrap();
        let reverse = align(
            vec![trace("b", b_len), trace("a", a_len)],
            AxisBasis::PerTraceSequence(vec![Arc::clone(&b), Arc::clone(&a)]),
            &options,
        ).unwrap();

        for member in &forward.members {
            let other = reverse.member(&member.trace.source).unwrap();
            prop_assert_eq!(member.trace.sample_count(), other.trace.sample_count());
            prop_assert!(member.trace.sample_count() <= member.original_len);
        }
        prop_assert_eq!(forward.common_extent.cycles(), reverse.common_extent.cycles());
        prop_assert_eq!(forward.warnings.len(), reverse.warnings.len());
    }

    /// Sample-index alignment keeps the shortest length and never grows a trace
    #[test]
    fn test_sample_index_keeps_shortest(lens in prop::collection::vec(1usize..2000, 1..6)) {
        let traces = lens
            .iter()
            .enumerate()
            .map(|(i, &len)| trace(&format!("t{}", i), len))
            .collect();
        let set = align(traces, AxisBasis::SampleIndex, &AlignOptions::default()).unwrap();
        let shortest = *lens.iter().min().unwrap();

        for member in &set.members {
            prop_assert_eq!(member.trace.sample_count(), shortest);
            prop_assert_eq!(member.axis.len(), shortest);
        }
        let truncated = lens.iter().filter(|&&len| len > shortest).count();
        prop_assert_eq!(set.warnings.len(), truncated);
    }

    /// Standardized traces have zero mean
    #[test]
    fn test_standardize_centers(len in 2usize..500) {
        let options = AlignOptions::with_normalization(Normalization::Standardize);
        let set = align(vec![trace("z", len)], AxisBasis::SampleIndex, &options).unwrap();
        let samples = &set.members[0].trace.samples;
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        prop_assert!(mean.abs() < 1e-9);
    }
}
