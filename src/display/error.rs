use std::path::PathBuf;

use thiserror::Error;

use crate::align::AlignError;
use crate::container::ContainerError;
use crate::render::RenderError;
use crate::sequence::SequenceError;

/// Errors raised while running a display request.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Multi-source comparison with a label count that differs from the source count
    #[error("{sources} sources but {labels} labels: every source needs exactly one label")]
    LabelCountMismatch {
        /// Number of sources
        sources: usize,
        /// Number of labels
        labels: usize,
    },

    /// Request is inconsistent before any file is touched
    #[error("Invalid display request: {0}")]
    InvalidRequest(String),

    /// No raft position of a grid request could be rendered
    #[error("Nothing to render: no raft position matched '{pattern}'")]
    NothingToRender {
        /// Grid filename pattern
        pattern: String,
    },

    /// Sequence file error
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Container error
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Alignment error
    #[error(transparent)]
    Align(#[from] AlignError),

    /// Render backend error
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Request file could not be read
    #[error("Failed to read request file {}: {source}", .path.display())]
    RequestFileIo {
        /// Request file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Request file is not valid TOML or holds an unknown request
    #[error("Failed to parse request file: {0}")]
    RequestFileParse(#[from] toml::de::Error),
}
