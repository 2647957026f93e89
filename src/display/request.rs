use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::DisplayError;
use crate::layout::{CcdPosition, ChannelSelection};

/// Placeholder replaced by the two-digit raft position in grid patterns.
pub const CCD_PLACEHOLDER: &str = "{ccd}";

/// How a grid request lays out the raft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridOutput {
    /// One figure per CCD
    #[default]
    PerCcd,
    /// One 2x3 figure for the whole raft
    Mosaic,
}

/// One display invocation.
///
/// Requests are plain data: they can be built in code, from command-line
/// arguments, or loaded in bulk from a request file. Paths are relative to the
/// session's data directory unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DisplayRequest {
    /// Two sources overlaid per channel, with the clock sequence drawn beneath
    Combined {
        /// First source
        first: PathBuf,
        /// Second source
        second: PathBuf,
        /// Channels, one figure each
        #[serde(default, alias = "channel")]
        channels: ChannelSelection,
        /// CCD the sources come from, when the file names don't say
        #[serde(default)]
        ccd: Option<CcdPosition>,
        /// Sequence file overriding the session's
        #[serde(default)]
        sequence: Option<PathBuf>,
    },

    /// All selected channels of one source overlaid in a single graph
    Scan {
        /// Source file
        source: PathBuf,
        /// Channels to overlay
        #[serde(default, alias = "channel")]
        channels: ChannelSelection,
    },

    /// One source per raft position, found by filename pattern
    Grid {
        /// Filename pattern containing `{ccd}` or starting with a raft prefix such as `00_`
        pattern: String,
        /// Figure layout
        #[serde(default)]
        output: GridOutput,
        /// Channels drawn for every position
        #[serde(default, alias = "channel")]
        channels: ChannelSelection,
    },

    /// Several labelled sources overlaid channel by channel
    Multi {
        /// Sources in display order
        sources: Vec<PathBuf>,
        /// One label per source
        labels: Vec<String>,
        /// Sequence files: none, one shared, or one per source
        #[serde(default)]
        sequences: Vec<PathBuf>,
        /// Channels, one panel each
        #[serde(default, alias = "channel")]
        channels: ChannelSelection,
    },
}

impl DisplayRequest {
    /// Mode name as used in request files
    pub fn mode(&self) -> &'static str {
        match self {
            DisplayRequest::Combined { .. } => "combined",
            DisplayRequest::Scan { .. } => "scan",
            DisplayRequest::Grid { .. } => "grid",
            DisplayRequest::Multi { .. } => "multi",
        }
    }

    /// Selected channels
    pub fn channels(&self) -> ChannelSelection {
        match self {
            DisplayRequest::Combined { channels, .. }
            | DisplayRequest::Scan { channels, .. }
            | DisplayRequest::Grid { channels, .. }
            | DisplayRequest::Multi { channels, .. } => *channels,
        }
    }
}

impl fmt::Display for DisplayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayRequest::Combined { first, second, .. } => write!(
                f,
                "combined {} + {}",
                first.display(),
                second.display()
            ),
            DisplayRequest::Scan { source, .. } => write!(f, "scan {}", source.display()),
            DisplayRequest::Grid {
                pattern, output, ..
            } => write!(f, "grid {} ({:?})", pattern, output),
            DisplayRequest::Multi { labels, .. } => write!(f, "multi [{}]", labels.join(", ")),
        }
    }
}

/// Expand a grid pattern for one raft position.
///
/// `{ccd}` is replaced wherever it occurs. Without a placeholder, a leading
/// two-digit raft prefix of the file name (`00_...`) is substituted.
pub fn expand_pattern(pattern: &str, ccd: CcdPosition) -> Result<PathBuf, DisplayError> {
    if pattern.contains(CCD_PLACEHOLDER) {
        return Ok(PathBuf::from(pattern.replace(CCD_PLACEHOLDER, &ccd.label())));
    }
    let path = Path::new(pattern);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| CcdPosition::from_file_prefix(n).is_some())
        .ok_or_else(|| {
            DisplayError::InvalidRequest(format!(
                "grid pattern '{}' has neither {} nor a raft prefix such as '00_'",
                pattern, CCD_PLACEHOLDER
            ))
        })?;
    Ok(path.with_file_name(format!("{}{}", ccd.label(), &file_name[2..])))
}

/// A batch of requests loaded from TOML.
///
/// ```toml
/// [[request]]
/// mode = "combined"
/// first = "scan-mode-dsi-cj-mod2/01_test-cj-mod2-dsi.fits"
/// second = "scan-mode-tm-cj-mod2/01_test-cj-mod2.fits"
/// channel = 3
/// ccd = "01"
///
/// [[request]]
/// mode = "grid"
/// pattern = "00_RTM1new_mod50_1s-scan.fits"
/// output = "mosaic"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestFile {
    /// Requests in file order
    #[serde(rename = "request", default)]
    pub requests: Vec<DisplayRequest>,
}

impl RequestFile {
    /// Load a request file
    pub fn from_file(path: &Path) -> Result<Self, DisplayError> {
        let content = std::fs::read_to_string(path).map_err(|source| DisplayError::RequestFileIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse request file content
    pub fn from_toml(content: &str) -> Result<Self, DisplayError> {
        Ok(toml::from_str(content)?)
    }
}
