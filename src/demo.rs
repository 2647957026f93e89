//! Synthetic scan data.
//!
//! Writes a raft of scan-mode FITS files whose samples follow a clock
//! sequence: a pedestal per channel, feedthrough steps from each clock line
//! and a little deterministic noise. Used by the `demo` command and by tests.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::axis::build_axis;
use crate::container::{ContainerError, FitsWriter};
use crate::layout::{CcdPosition, CHANNELS_PER_CCD};
use crate::sequence::{SequenceError, SequenceFile, SequenceProgram};

/// Errors raised while writing demo data
#[derive(Debug, Error)]
pub enum DemoError {
    /// Could not create the directory or a text file
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Could not write a container
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Generated sequence failed to parse
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Sequencer file text with a configurable signal window.
///
/// The cycle is `10 + 30 + signal_ns / 10 + 10` ticks at the 10 ns clock.
pub fn demo_sequence(signal_ns: u32) -> String {
    format!(
        r#"# Synthetic scan-mode readout
[constants]
  clockperiod = 10 ns
  TimeReset   = 100 ns
  TimePed     = 300 ns
  TimeSig     = {signal_ns} ns
  TimeDump    = 100 ns

[clocks]
  RG: 0
  S1: 1
  S2: 2
  S3: 3
  P2: 4

[functions]
  ReadPixel:
    clocks:    RG, S1, S2, S3
    slices:
      TimeReset = 1, 0, 1, 0
      TimePed   = 0, 0, 1, 0
      TimeSig   = 0, 1, 0, 1
      TimeDump  = 0, 0, 0, 1
    constants: P2=0
"#
    )
}

/// Parse [`demo_sequence`] into a program.
pub fn demo_program(signal_ns: u32) -> Result<SequenceProgram, SequenceError> {
    SequenceFile::parse_str(&demo_sequence(signal_ns), Path::new("demo.seq"))?.program(None)
}

/// Samples of one synthetic channel following `program`.
pub fn synthetic_samples(program: &SequenceProgram, len: usize, channel: usize, seed: u64) -> Vec<i32> {
    let weights = [250.0, -400.0, 120.0, -60.0];
    let pedestal = 20_000.0 + 150.0 * channel as f64;
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(channel as u64 + 1);

    build_axis(program, len)
        .iter()
        .map(|point| {
            let interval = &program.intervals[point.interval];
            let feedthrough: f64 = program
                .clocks
                .iter()
                .zip(weights.iter().cycle())
                .map(|(clock, w)| w * interval.level(clock).unwrap_or(0) as f64)
                .sum();
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((state >> 33) % 21) as f64 - 10.0;
            (pedestal + feedthrough + noise).round() as i32
        })
        .collect()
}

/// Write one scan-mode FITS file with `channels` amplifier extensions.
pub fn write_scan_fits(
    path: &Path,
    program: &SequenceProgram,
    sequence_name: &str,
    len: usize,
    channels: usize,
    seed: u64,
) -> Result<(), ContainerError> {
    let mut writer = FitsWriter::new()
        .keyword("READMODE", "SCAN")
        .keyword("CLKPER", program.tick_period_ns)
        .keyword("SEQNAME", sequence_name)
        .keyword("DATE-OBS", "2017-03-21T20:03:20.000");
    for channel in 0..channels {
        let samples = synthetic_samples(program, len, channel, seed);
        writer = writer.image_i32(&format!("Segment{:02}", channel), len, 1, samples);
    }
    writer.write(path)
}

/// Shape of a demo data set.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Readout cycles in each file
    pub cycles: usize,
    /// Raft positions to leave out
    pub missing: Vec<CcdPosition>,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            cycles: 50,
            missing: Vec::new(),
        }
    }
}

/// What [`write_demo`] produced.
#[derive(Debug, Clone, Default)]
pub struct DemoFiles {
    /// Sequence files
    pub sequences: Vec<PathBuf>,
    /// Raft scan files, one per present position
    pub raft: Vec<PathBuf>,
    /// Second acquisition of CCD 00 with a longer signal window
    pub alternate: PathBuf,
    /// Example request file
    pub requests: PathBuf,
}

/// Write a demo data set into `dir`.
///
/// Produces `demo.seq` (80-tick cycle) and `demo_long.seq` (100-tick cycle), a
/// raft of `RC_demo-scan.fits` files, a longer-window `00_demo-long-scan.fits`
/// taken with the second sequence, and `requests.toml` exercising every mode.
pub fn write_demo(dir: &Path, options: &DemoOptions) -> Result<DemoFiles, DemoError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DemoError::Io { path, source }
    };
    std::fs::create_dir_all(dir).map_err(io(dir))?;

    let short_path = dir.join("demo.seq");
    let long_path = dir.join("demo_long.seq");
    std::fs::write(&short_path, demo_sequence(300)).map_err(io(&short_path))?;
    std::fs::write(&long_path, demo_sequence(500)).map_err(io(&long_path))?;
    let short = demo_program(300)?;
    let long = demo_program(500)?;

    let mut files = DemoFiles {
        sequences: vec![short_path, long_path],
        ..Default::default()
    };

    let len = options.cycles * short.total_ticks() as usize;
    for (i, ccd) in CcdPosition::all().enumerate() {
        if options.missing.contains(&ccd) {
            continue;
        }
        let path = dir.join(format!("{}_demo-scan.fits", ccd));
        write_scan_fits(&path, &short, "demo.seq", len, CHANNELS_PER_CCD, i as u64)?;
        files.raft.push(path);
    }

    // fewer cycles of a longer program, so a comparison has to truncate
    let alternate_len = options.cycles.saturating_sub(5).max(1) * long.total_ticks() as usize;
    files.alternate = dir.join("00_demo-long-scan.fits");
    write_scan_fits(&files.alternate, &long, "demo_long.seq", alternate_len, CHANNELS_PER_CCD, 99)?;

    files.requests = dir.join("requests.toml");
    std::fs::write(&files.requests, DEMO_REQUESTS).map_err(io(&files.requests))?;

    info!(
        "Wrote demo raft ({} CCDs) and sequences to {}",
        files.raft.len(),
        dir.display()
    );
    Ok(files)
}

const DEMO_REQUESTS: &str = r#"# Run with: raftscope --data-dir <dir> --seq demo.seq --batch run requests.toml

[[request]]
mode = "combined"
first = "00_demo-scan.fits"
second = "01_demo-scan.fits"
channel = 3

[[request]]
mode = "scan"
source = "00_demo-scan.fits"
channels = "0..8"

[[request]]
mode = "grid"
pattern = "{ccd}_demo-scan.fits"
output = "mosaic"

[[request]]
mode = "multi"
sources = ["00_demo-scan.fits", "00_demo-long-scan.fits"]
labels = ["short", "long"]
sequences = ["demo.seq", "demo_long.seq"]
channels = "0..4"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RequestFile;
    use tempfile::tempdir;

    #[test]
    fn test_demo_program_cycle() {
        assert_eq!(demo_program(300).unwrap().total_ticks(), 80);
        assert_eq!(demo_program(500).unwrap().total_ticks(), 100);
    }

    #[test]
    fn test_synthetic_samples_follow_clocks() {
        let program = demo_program(300).unwrap();
        let samples = synthetic_samples(&program, 160, 0, 7);
        assert_eq!(samples.len(), 160);
        // reset slice (RG high) sits well above the signal slice (S1 high)
        assert!(samples[5] - samples[50] > 500);
        // same position in the next cycle agrees up to noise
        assert!((samples[5] - samples[85]).abs() <= 20);
    }

    #[test]
    fn test_write_demo() {
        let dir = tempdir().unwrap();
        let options = DemoOptions {
            cycles: 10,
            missing: vec![CcdPosition::new(1, 2).unwrap()],
        };
        let files = write_demo(dir.path(), &options).unwrap();
        assert_eq!(files.raft.len(), 5);
        assert!(files.alternate.is_file());
        assert_eq!(files.sequences.len(), 2);

        let requests = RequestFile::from_file(&files.requests).unwrap();
        assert_eq!(requests.requests.len(), 4);
    }
}
