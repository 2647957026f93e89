//! Extracted channel traces.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::container::{ContainerFormat, ContainerMetadata, ReadoutMode};
use crate::layout::CcdPosition;

/// Identifies where a trace came from: file, channel and optional label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId {
    /// Container path
    pub path: PathBuf,
    /// Amplifier channel
    pub channel: usize,
    /// Display label, if the request supplied one
    pub label: Option<String>,
}

impl SourceId {
    /// Create an unlabeled source id
    pub fn new(path: impl Into<PathBuf>, channel: usize) -> Self {
        Self {
            path: path.into(),
            channel,
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// File name component of the path
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Short name for legends: the label when present, otherwise the file name.
    pub fn display_name(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.file_name())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}: {}[c{}]", label, self.file_name(), self.channel),
            None => write!(f, "{}[c{}]", self.file_name(), self.channel),
        }
    }
}

/// Acquisition metadata carried with a trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetadata {
    /// Container format the trace was read from
    pub format: ContainerFormat,
    /// Readout mode
    pub readout_mode: ReadoutMode,
    /// Sample period in nanoseconds, when recorded
    pub sample_period_ns: Option<f64>,
    /// Sequencer file recorded in the container
    pub sequence_name: Option<String>,
    /// Acquisition start
    pub date_obs: Option<NaiveDateTime>,
}

impl From<&ContainerMetadata> for TraceMetadata {
    fn from(meta: &ContainerMetadata) -> Self {
        Self {
            format: meta.format,
            readout_mode: meta.readout_mode,
            sample_period_ns: meta.sample_period_ns,
            sequence_name: meta.sequence_name.clone(),
            date_obs: meta.date_obs,
        }
    }
}

/// One amplifier's samples extracted from a scan container.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    /// Origin of the samples
    pub source: SourceId,
    /// Samples in readout order
    pub samples: Vec<f64>,
    /// Amplifier channel (0–15)
    pub channel: usize,
    /// CCD position in the raft, when known
    pub ccd: Option<CcdPosition>,
    /// Acquisition metadata
    pub metadata: TraceMetadata,
}

impl ChannelTrace {
    /// Number of samples. Always equal to `samples.len()`.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Container path
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    /// Attach a display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.source.label = Some(label.into());
        self
    }

    /// Set the CCD position
    pub fn with_ccd(mut self, ccd: CcdPosition) -> Self {
        self.ccd = Some(ccd);
        self
    }
}
