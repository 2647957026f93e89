//! # Scan containers
//!
//! Test-stand scan data arrives in two container formats:
//!
//! - **FITS**: the native multi-extension image format, one IMAGE extension per
//!   amplifier channel.
//! - **REB raw**: the legacy headerless dump of interleaved 32-bit words.
//!
//! Both are exposed through the [`ScanContainer`] capability trait. The format is
//! resolved by inspecting file content ([`sniff`]), never by extension: legacy
//! raw dumps have been found renamed next to modern containers.
//!
//! Containers are scoped acquisitions. The file handle lives inside the boxed
//! container and is released when it is dropped.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use raftscope::container;
//!
//! let mut scan = container::open(Path::new("00_RTM1new_mod50_1s-scan.fits"))?;
//! println!("{} with {} channels", scan.format(), scan.channel_count());
//! let samples = scan.read_channel(3)?;
//! # Ok::<(), raftscope::container::ContainerError>(())
//! ```

mod error;
pub mod fits;
mod fits_writer;
pub mod raw;


use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;

pub use error::ContainerError;
pub use fits::FitsContainer;
pub use fits_writer::FitsWriter;
pub use raw::{write_reb_raw, RawContainer};

/// Bytes inspected when resolving the format of a file.
pub const SNIFF_LEN: usize = raw::SNIFF_FRAMES * raw::FRAME_BYTES;

/// Recognised container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContainerFormat {
    /// Multi-extension FITS
    Fits,
    /// Legacy REB raw dump
    RebRaw,
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerFormat::Fits => write!(f, "FITS"),
            ContainerFormat::RebRaw => write!(f, "REB raw"),
        }
    }
}

/// How the acquisition was read out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadoutMode {
    /// Scan mode: every sequencer tick sampled, many repeated cycles
    Scan,
    /// Normal image readout, one sample per pixel
    Image,
    /// Not recorded in the container
    Unknown,
}

impl fmt::Display for ReadoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadoutMode::Scan => write!(f, "scan"),
            ReadoutMode::Image => write!(f, "image"),
            ReadoutMode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Acquisition metadata common to all container formats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerMetadata {
    /// Container format
    pub format: ContainerFormat,
    /// Readout mode
    pub readout_mode: ReadoutMode,
    /// Time between consecutive samples in nanoseconds, when recorded
    pub sample_period_ns: Option<f64>,
    /// Name of the sequencer file used for the acquisition, when recorded
    pub sequence_name: Option<String>,
    /// Acquisition start time, when recorded
    pub date_obs: Option<NaiveDateTime>,
}

impl ContainerMetadata {
    /// Metadata with nothing but the format known.
    pub fn new(format: ContainerFormat) -> Self {
        Self {
            format,
            readout_mode: ReadoutMode::Unknown,
            sample_period_ns: None,
            sequence_name: None,
            date_obs: None,
        }
    }
}

/// A scan container opened for channel extraction.
pub trait ScanContainer {
    /// Path the container was opened from.
    fn path(&self) -> &Path;

    /// Acquisition metadata.
    fn metadata(&self) -> &ContainerMetadata;

    /// Number of amplifier channels the container declares.
    fn channel_count(&self) -> usize;

    /// Number of samples the container declares for a channel.
    fn declared_len(&self, channel: usize) -> Result<usize, ContainerError>;

    /// Read one channel's samples in readout order, as physical values.
    fn read_channel(&mut self, channel: usize) -> Result<Vec<f64>, ContainerError>;

    /// Human-readable name of a channel.
    fn channel_name(&self, channel: usize) -> String {
        format!("c{:02}", channel)
    }

    /// Container format.
    fn format(&self) -> ContainerFormat {
        self.metadata().format
    }

    /// Fail with [`ContainerError::ChannelIndexOutOfRange`] unless `channel` exists.
    fn check_channel(&self, channel: usize) -> Result<(), ContainerError> {
        let available = self.channel_count();
        if channel < available {
            Ok(())
        } else {
            Err(ContainerError::ChannelIndexOutOfRange {
                path: self.path().to_path_buf(),
                channel,
                available,
            })
        }
    }
}

/// Resolve a container's format from its leading bytes and total length.
///
/// Returns the reason no format matched as the error.
pub fn sniff(prefix: &[u8], file_len: u64) -> Result<ContainerFormat, String> {
    if fits::is_fits(prefix) {
        return Ok(ContainerFormat::Fits);
    }
    raw::check_reb_raw(prefix, file_len)?;
    Ok(ContainerFormat::RebRaw)
}

/// Inspect a file and return its container format without parsing it further.
pub fn probe(path: &Path) -> Result<ContainerFormat, ContainerError> {
    if !path.is_file() {
        return Err(ContainerError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| ContainerError::io(path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| ContainerError::io(path, e))?
        .len();
    let mut prefix = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut prefix)
        .map_err(|e| ContainerError::io(path, e))?;

    let format = sniff(&prefix, file_len).map_err(|reason| ContainerError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    })?;
    debug!("{}: detected {} container", path.display(), format);
    Ok(format)
}

/// Open a scan container, selecting the implementation by content.
pub fn open(path: &Path) -> Result<Box<dyn ScanContainer>, ContainerError> {
    match probe(path)? {
        ContainerFormat::Fits => Ok(Box::new(FitsContainer::open(path)?)),
        ContainerFormat::RebRaw => Ok(Box::new(RawContainer::open(path)?)),
    }
}
