use std::collections::BTreeMap;
use std::sync::Arc;

use super::*;
use crate::container::{ContainerFormat, ReadoutMode};
use crate::sequence::Interval;
use crate::trace::TraceMetadata;

fn trace(name: &str, len: usize) -> ChannelTrace {
    ChannelTrace {
        source: SourceId::new(format!("{}.fits", name), 0),
        samples: (0..len).map(|i| (i % 97) as f64).collect(),
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

fn program(name: &str, ticks: &[u64]) -> Arc<SequenceProgram> {
    Arc::new(SequenceProgram {
        name: name.to_string(),
        clocks: vec!["RG".to_string()],
        intervals: ticks
            .iter()
            .enumerate()
            .map(|(i, &duration_ticks)| Interval {
                name: format!("{}.{}", name, i),
                duration_ticks,
                levels: BTreeMap::from([("RG".to_string(), (i % 2) as u8)]),
            })
            .collect(),
        tick_period_ns: 10.0,
    })
}

#[test]
fn test_truncates_to_common_cycle_count() {
    // 5000 samples of a 1000-tick cycle against 4800 samples of a 1200-tick cycle
    let a = program("mod2", &[400, 600]);
    let b = program("mod50", &[200, 1000]);
    let set = align(
        vec![trace("a", 5000), trace("b", 4800)],
        AxisBasis::PerTraceSequence(vec![a, b]),
        &AlignOptions::default(),
    )
    .unwrap();

    assert_eq!(set.basis_kind, BasisKind::PerTraceSequence);
    assert_eq!(set.common_extent.cycles(), 4.0);
    assert_eq!(set.members[0].trace.sample_count(), 4000);
    assert_eq!(set.members[1].trace.sample_count(), 4800);
    assert!(set.members[0].was_truncated());
    assert!(!set.members[1].was_truncated());

    assert_eq!(set.warnings.len(), 1);
    match &set.warnings[0] {
        AlignmentWarning::Truncated {
            source,
            original_len,
            kept_len,
            discarded_cycles,
        } => {
            assert_eq!(source.path.to_str(), Some("a.fits"));
            assert_eq!(*original_len, 5000);
            assert_eq!(*kept_len, 4000);
            assert_eq!(*discarded_cycles, Some(1.0));
        }
    }
    assert!(set.warnings[0].to_string().contains("5000 to 4000"));

    // both axes end at cycle 4
    for member in &set.members {
        assert_eq!(member.axis.full_cycles(), 4);
        assert_eq!(member.axis.partial_cycle(), None);
    }
    assert!(set.shared_axis().is_none());
}

#[test]
fn test_align_is_order_independent() {
    let a = program("mod2", &[400, 600]);
    let b = program("mod50", &[200, 1000]);
    let forward = align(
        vec![trace("a", 5000), trace("b", 4800)],
        AxisBasis::PerTraceSequence(vec![a.clone(), b.clone()]),
        &AlignOptions::default(),
    )
    .unwrap();
    let reverse = align(
        vec![trace("b", 4800), trace("a", 5000)],
        AxisBasis::PerTraceSequence(vec![b, a]),
        &AlignOptions::default(),
    )
    .unwrap();

    assert_eq!(forward.common_extent.cycles(), reverse.common_extent.cycles());
    for member in &forward.members {
        let other = reverse.member(&member.trace.source).unwrap();
        assert!(member.axis.same_as(&other.axis));
        assert_eq!(member.trace.samples, other.trace.samples);
    }
}

#[test]
fn test_shared_sequence_has_shared_axis() {
    let p = program("ReadPixel", &[20, 30, 5, 2]);
    let set = align(
        vec![trace("a", 570), trace("b", 600)],
        AxisBasis::SharedSequence(p.clone()),
        &AlignOptions::default(),
    )
    .unwrap();

    let axis = set.shared_axis().unwrap();
    assert_eq!(axis.len(), 570);
    assert!(Arc::ptr_eq(axis.program().unwrap(), &p));
    assert_eq!(set.members[0].x_values()[57], 1.0);
    // 600 - 570 samples at 57 ticks per cycle
    match &set.warnings[..] {
        [AlignmentWarning::Truncated {
            discarded_cycles: Some(c),
            ..
        }] => assert!((c - 30.0 / 57.0).abs() < 1e-12),
        other => panic!("unexpected warnings: {other:?}"),
    }
}

#[test]
fn test_sample_index_basis() {
    let set = align(
        vec![trace("a", 10), trace("b", 7), trace("c", 7)],
        AxisBasis::SampleIndex,
        &AlignOptions::default(),
    )
    .unwrap();
    assert_eq!(set.common_extent.cycles(), 7.0);
    assert_eq!(set.shared_axis().map(|a| a.len()), Some(7));
    assert_eq!(set.members[0].x_values(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(matches!(
        set.warnings[..],
        [AlignmentWarning::Truncated {
            discarded_cycles: None,
            kept_len: 7,
            ..
        }]
    ));
}

#[test]
fn test_single_trace_is_untouched() {
    let set = align(
        vec![trace("only", 123)],
        AxisBasis::SharedSequence(program("p", &[10])),
        &AlignOptions::default(),
    )
    .unwrap();
    assert!(set.warnings.is_empty());
    assert_eq!(set.members[0].trace.sample_count(), 123);
    assert_eq!(
        set.members[0].axis.partial_cycle().map(|p| p.samples),
        Some(3)
    );
}

#[test]
fn test_align_errors() {
    assert!(matches!(
        align(Vec::new(), AxisBasis::SampleIndex, &AlignOptions::default()),
        Err(AlignError::Empty)
    ));
    assert!(matches!(
        align(
            vec![trace("a", 10), trace("b", 10)],
            AxisBasis::PerTraceSequence(vec![program("p", &[5])]),
            &AlignOptions::default(),
        ),
        Err(AlignError::SequenceCountMismatch {
            traces: 2,
            programs: 1
        })
    ));
    assert!(matches!(
        align(
            vec![trace("a", 10)],
            AxisBasis::SharedSequence(program("flat", &[0, 0])),
            &AlignOptions::default(),
        ),
        Err(AlignError::EmptyCycle { .. })
    ));
}

#[test]
fn test_normalization_after_truncation() {
    let mut a = trace("a", 4);
    a.samples = vec![10.0, 12.0, 14.0, 1000.0];
    let mut b = trace("b", 3);
    b.samples = vec![1.0, 2.0, 3.0];

    let set = align(
        vec![a, b],
        AxisBasis::SampleIndex,
        &AlignOptions::with_normalization(Normalization::Offset),
    )
    .unwrap();
    // the outlier was truncated away before the mean was taken
    assert_eq!(set.members[0].trace.samples, vec![-2.0, 0.0, 2.0]);
    assert_eq!(set.members[1].trace.samples, vec![-1.0, 0.0, 1.0]);
}

#[test]
fn test_normalization_modes() {
    let mut samples = vec![1.0, 3.0];
    Normalization::Standardize.apply(&mut samples);
    assert_eq!(samples, vec![-1.0, 1.0]);

    let mut flat = vec![5.0, 5.0];
    Normalization::Standardize.apply(&mut flat);
    assert_eq!(flat, vec![0.0, 0.0]);

    let mut untouched = vec![5.0, 6.0];
    Normalization::None.apply(&mut untouched);
    assert_eq!(untouched, vec![5.0, 6.0]);

    assert_eq!("zscore".parse::<Normalization>(), Ok(Normalization::Standardize));
    assert_eq!("Offset".parse::<Normalization>(), Ok(Normalization::Offset));
    assert!("median".parse::<Normalization>().is_err());
    assert_eq!(Normalization::Standardize.to_string(), "standardize");
}
