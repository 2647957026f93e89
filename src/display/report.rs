use std::path::PathBuf;

use serde::Serialize;

use crate::align::AlignmentWarning;
use crate::layout::CcdPosition;
use crate::render::RenderOutput;

/// A raft position a grid request could not render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPosition {
    /// Raft position
    pub ccd: CcdPosition,
    /// Expected source path
    pub path: PathBuf,
    /// Why the position was skipped
    pub reason: String,
}

/// Outcome of one display request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayReport {
    /// Rendered figures, in order
    pub outputs: Vec<RenderOutput>,
    /// Grid positions that were skipped
    pub skipped: Vec<SkippedPosition>,
    /// Alignment warnings
    pub warnings: Vec<AlignmentWarning>,
}

impl DisplayReport {
    /// Whether the request completed without skips or warnings
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.warnings.is_empty()
    }

    /// Append another report
    pub fn merge(&mut self, other: DisplayReport) {
        self.outputs.extend(other.outputs);
        self.skipped.extend(other.skipped);
        self.warnings.extend(other.warnings);
    }
}
