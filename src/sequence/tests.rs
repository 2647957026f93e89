use std::path::Path;

use super::*;

const SCAN_SEQ: &str = r#"
# Scan-mode pixel readout
[constants]
  clockperiod = 10 ns
  TimeP       = 200 ns
  TimeS       = 0.3 us
  TimeRG      = TimeP

[clocks]
  RG:  0
  S1:  1
  S2:  2
  RST: 3
  P2:  4

[pointers]
  REP_FUNC PixelCount 512

[functions]
  ReadPixel:
    clocks:    RG, S1, S2
    slices:
      TimeRG   = 1, 0, 1
      TimeS    = 0, 1, 1
      50 ns    = 0, 0, 1   # literal duration
      2        = 0, 0, 0
    constants: P2=1

  Idle:
    clocks: RST
    slices:
      TimeP = 1

[mains]
  Bias: CALL ReadPixel repeat(100)
"#;

fn parse_text(text: &str, function: Option<&str>) -> Result<SequenceProgram, SequenceError> {
    SequenceFile::parse_str(text, Path::new("test.seq"))?.program(function)
}

#[test]
fn test_parse_read_pixel() {
    let program = parse_text(SCAN_SEQ, None).unwrap();
    assert_eq!(program.name, "ReadPixel");
    assert_eq!(program.clocks, vec!["RG", "S1", "S2", "P2"]);
    assert_eq!(program.tick_period_ns, 10.0);

    let names: Vec<&str> = program.intervals.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["TimeRG", "TimeS", "ReadPixel.2", "ReadPixel.3"]);

    let ticks: Vec<u64> = program.intervals.iter().map(|i| i.duration_ticks).collect();
    assert_eq!(ticks, vec![20, 30, 5, 2]);
    assert_eq!(program.total_ticks(), 57);

    let first = &program.intervals[0];
    assert_eq!(first.level("RG"), Some(1));
    assert_eq!(first.level("S1"), Some(0));
    assert_eq!(first.level("P2"), Some(1));
    assert_eq!(first.level("RST"), None);
}

#[test]
fn test_select_named_function() {
    let program = parse_text(SCAN_SEQ, Some("Idle")).unwrap();
    assert_eq!(program.total_ticks(), 20);
    assert_eq!(program.clocks, vec!["RST"]);
}

#[test]
fn test_unknown_function() {
    let err = parse_text(SCAN_SEQ, Some("ReadRow")).unwrap_err();
    match err {
        SequenceError::Malformed { reason, .. } => {
            assert!(reason.contains("ReadRow"));
            assert!(reason.contains("ReadPixel, Idle"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_ambiguous_default_function() {
    let text = r#"
[functions]
  A:
    clocks: S1
    slices:
      10 = 1
  B:
    clocks: S1
    slices:
      10 = 0
"#;
    assert!(matches!(
        parse_text(text, None),
        Err(SequenceError::Malformed { line: 0, .. })
    ));
    assert_eq!(parse_text(text, Some("B")).unwrap().total_ticks(), 10);
}

#[test]
fn test_level_count_mismatch_reports_line() {
    let text = "[functions]\n  F:\n    clocks: RG, S1\n    slices:\n      10 = 1\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { line, reason, .. }) => {
            assert_eq!(line, 5);
            assert!(reason.contains("expected 2 levels"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_negative_duration_rejected() {
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      -30 ns = 1\n";
    assert!(matches!(
        parse_text(text, None),
        Err(SequenceError::Malformed { line: 5, .. })
    ));
}

#[test]
fn test_zero_total_duration_rejected() {
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      0 = 1\n      0 ns = 0\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { reason, .. }) => assert!(reason.contains("zero total")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_huge_slice_rejected() {
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      10000000000000000000 = 1\n      10000000000000000000 = 0\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { line, reason, .. }) => {
            assert_eq!(line, 5);
            assert!(reason.contains("tick limit"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_cycle_length_overflow_rejected() {
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      600000000000 = 1\n      600000000000 = 0\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { line, reason, .. }) => {
            assert_eq!(line, 6);
            assert!(reason.contains("cycle length overflows"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_total_ticks_saturates() {
    let slice = |duration_ticks| Interval {
        name: "S".to_string(),
        duration_ticks,
        levels: Default::default(),
    };
    let program = SequenceProgram {
        name: "F".to_string(),
        clocks: Vec::new(),
        intervals: vec![slice(u64::MAX), slice(u64::MAX)],
        tick_period_ns: DEFAULT_TICK_PERIOD_NS,
    };
    assert_eq!(program.total_ticks(), u64::MAX);
    assert_eq!(program.interval_ends(), vec![u64::MAX, u64::MAX]);
}

#[test]
fn test_zero_length_interval_allowed() {
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      0 = 1\n      10 = 0\n";
    let program = parse_text(text, None).unwrap();
    assert_eq!(program.interval_at(0), Some(1));
    assert_eq!(program.interval_at(9), Some(1));
    assert_eq!(program.interval_at(10), None);
}

#[test]
fn test_undeclared_clock_rejected() {
    let text = "[clocks]\n  RG: 0\n[functions]\n  F:\n    clocks: RG, S9\n    slices:\n      10 = 1, 0\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { reason, .. }) => assert!(reason.contains("S9")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_unknown_constant_and_cycle() {
    let text = "[constants]\n  A = B\n  B = A\n[functions]\n  F:\n    clocks: RG\n    slices:\n      A = 1\n";
    assert!(parse_text(text, None).is_err());
    let text = "[functions]\n  F:\n    clocks: RG\n    slices:\n      Missing = 1\n";
    match parse_text(text, None) {
        Err(SequenceError::Malformed { reason, .. }) => assert!(reason.contains("unknown constant")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_unknown_section_rejected() {
    assert!(SequenceFile::parse_str("[bogus]\n", Path::new("x.seq")).is_err());
    assert!(SequenceFile::parse_str("TimeP = 1\n", Path::new("x.seq")).is_err());
}

#[test]
fn test_custom_clock_period() {
    let text = "[constants]\n  clockperiod = 20 ns\n[functions]\n  F:\n    clocks: RG\n    slices:\n      100 ns = 1\n";
    let program = parse_text(text, None).unwrap();
    assert_eq!(program.tick_period_ns, 20.0);
    assert_eq!(program.total_ticks(), 5);
    assert_eq!(program.cycle_ns(), 100.0);
}

#[test]
fn test_parse_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse(&dir.path().join("absent.seq"), None).unwrap_err();
    assert!(matches!(err, SequenceError::NotFound { .. }));
}

#[test]
fn test_parse_twice_is_value_equal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.seq");
    std::fs::write(&path, SCAN_SEQ).unwrap();

    let first = parse(&path, None).unwrap();
    let second = parse(&path, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cache_returns_shared_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.seq");
    std::fs::write(&path, SCAN_SEQ).unwrap();

    let mut cache = SequenceCache::new();
    let a = cache.get_or_parse(&path, None).unwrap();
    let b = cache.get_or_parse(&path, None).unwrap();
    let idle = cache.get_or_parse(&path, Some("Idle")).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_ne!(*a, *idle);
    assert_eq!(cache.len(), 2);
}
