use std::path::PathBuf;

/// Errors that can occur while loading a sequencer file
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    /// The sequencer file does not exist
    #[error("Sequence file not found: {}", .path.display())]
    NotFound {
        /// Resolved path that was looked up
        path: PathBuf,
    },

    /// I/O error while reading the file
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file does not describe a well-formed ordered list of intervals
    #[error("Malformed sequence file {}:{line}: {reason}", .path.display())]
    Malformed {
        /// File being parsed
        path: PathBuf,
        /// 1-based line number, 0 when the problem is not tied to a line
        line: usize,
        /// What was wrong
        reason: String,
    },
}
