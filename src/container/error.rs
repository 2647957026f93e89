use std::path::PathBuf;

use super::ContainerFormat;

/// Errors that can occur while opening or reading a scan container
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The container file does not exist
    #[error("Scan file not found: {}", .path.display())]
    NotFound {
        /// Resolved path that was looked up
        path: PathBuf,
    },

    /// I/O error while reading or writing
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Content is neither a FITS file nor a legacy REB raw dump
    #[error("Unsupported container format for {}: {reason}", .path.display())]
    UnsupportedFormat {
        /// File that was inspected
        path: PathBuf,
        /// Why no format matched
        reason: String,
    },

    /// A recognised container with a corrupt header
    #[error("Invalid header in {} (HDU {hdu}): {reason}", .path.display())]
    InvalidHeader {
        /// File being parsed
        path: PathBuf,
        /// Header/data unit index
        hdu: usize,
        /// What was wrong
        reason: String,
    },

    /// The file is shorter than its headers declare
    #[error("Truncated data in {}: expected {expected} bytes, found {actual}", .path.display())]
    Truncated {
        /// File being read
        path: PathBuf,
        /// Bytes required
        expected: u64,
        /// Bytes available
        actual: u64,
    },

    /// Channel index outside the container's amplifier count
    #[error(
        "Channel index {channel} out of range for {} ({available} channels available)",
        .path.display()
    )]
    ChannelIndexOutOfRange {
        /// File being read
        path: PathBuf,
        /// Requested channel
        channel: usize,
        /// Number of channels the container declares
        available: usize,
    },

    /// Sources of one comparison use different container formats
    #[error(
        "Cannot compare {} ({first_format}) with {} ({other_format}): mixing container formats is not supported",
        .first.display(),
        .other.display()
    )]
    MixedFormat {
        /// First source of the comparison
        first: PathBuf,
        /// Its format
        first_format: ContainerFormat,
        /// Source whose format differs
        other: PathBuf,
        /// Its format
        other_format: ContainerFormat,
    },

    /// Data rejected by a container writer
    #[error("Cannot write {}: {reason}", .path.display())]
    InvalidData {
        /// Output file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },
}

impl ContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }
}
