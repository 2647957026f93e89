//! Session configuration.
//!
//! Every display request runs against an explicit [`ScopeConfig`] instead of
//! process-wide settings, so requests can be built and tested independently.
//!
//! ```toml
//! # raftscope.toml
//! [scope]
//! data_dir = "/data/TS8/RTM1/Run4846D/RTM1new_mod50"
//! sequence = "RTM1/TS8_ITL_RTM1new_mod50.seq"
//! function = "ReadPixel"
//! output_dir = "plots"
//! interactive = false
//! normalization = "offset"
//! max_points = 20000
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::align::Normalization;

/// Default upper bound on plotted points per series.
pub const DEFAULT_MAX_POINTS: usize = 20_000;

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading the file
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration shared by all requests of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeConfig {
    /// Directory that relative source and sequence paths are resolved against.
    pub data_dir: PathBuf,

    /// Sequencer file used for the time axis, relative to `data_dir` unless absolute.
    pub sequence_file: Option<PathBuf>,

    /// Sequencer function describing one readout cycle.
    pub sequence_function: Option<String>,

    /// Directory batch renders are written to.
    pub output_dir: PathBuf,

    /// Render for interactive viewing instead of writing batch artifacts.
    pub interactive: bool,

    /// Offset/scale normalization applied after alignment.
    pub normalization: Normalization,

    /// Upper bound on plotted points per series.
    pub max_points: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            sequence_file: None,
            sequence_function: None,
            output_dir: PathBuf::from("."),
            interactive: false,
            normalization: Normalization::None,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl ScopeConfig {
    /// Create a configuration rooted at a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Set the sequencer file.
    pub fn with_sequence(mut self, sequence_file: impl Into<PathBuf>) -> Self {
        self.sequence_file = Some(sequence_file.into());
        self
    }

    /// Set the batch output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Toggle interactive rendering.
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Set the normalization mode.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Resolve a path against the data directory. Absolute paths are returned unchanged.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Overlay values present in a config file section.
    pub fn apply(&mut self, file: &ScopeSection) {
        if let Some(dir) = &file.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(seq) = &file.sequence {
            self.sequence_file = Some(seq.clone());
        }
        if let Some(function) = &file.function {
            self.sequence_function = Some(function.clone());
        }
        if let Some(dir) = &file.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(interactive) = file.interactive {
            self.interactive = interactive;
        }
        if let Some(normalization) = file.normalization {
            self.normalization = normalization;
        }
        if let Some(max_points) = file.max_points {
            self.max_points = max_points.max(2);
        }
    }
}

/// Root structure of a `raftscope.toml` file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Session settings.
    #[serde(default)]
    pub scope: ScopeSection,
}

/// The `[scope]` table. Every field is optional and overrides the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeSection {
    /// Data directory
    pub data_dir: Option<PathBuf>,
    /// Sequencer file
    pub sequence: Option<PathBuf>,
    /// Sequencer function name
    pub function: Option<String>,
    /// Batch output directory
    pub output_dir: Option<PathBuf>,
    /// Interactive rendering toggle
    pub interactive: Option<bool>,
    /// Normalization mode
    pub normalization: Option<Normalization>,
    /// Plotted points per series
    pub max_points: Option<usize>,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Build a session configuration from defaults plus this file.
    pub fn into_config(self) -> ScopeConfig {
        let mut config = ScopeConfig::default();
        config.apply(&self.scope);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [scope]
            data_dir = "/data/RTM1new_mod50"
            sequence = "RTM1/TS8_ITL_RTM1new_mod50.seq"
            function = "ReadPixel"
            output_dir = "plots"
            interactive = true
            normalization = "standardize"
            max_points = 5000
        "#;

        let config = ConfigFile::from_toml(toml).unwrap().into_config();
        assert_eq!(config.data_dir, PathBuf::from("/data/RTM1new_mod50"));
        assert_eq!(
            config.sequence_file,
            Some(PathBuf::from("RTM1/TS8_ITL_RTM1new_mod50.seq"))
        );
        assert_eq!(config.sequence_function.as_deref(), Some("ReadPixel"));
        assert!(config.interactive);
        assert_eq!(config.normalization, Normalization::Standardize);
        assert_eq!(config.max_points, 5000);
    }

    #[test]
    fn test_empty_config() {
        let config = ConfigFile::from_toml("").unwrap().into_config();
        assert_eq!(config, ScopeConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = r#"
            [scope]
            datadir = "/typo"
        "#;
        assert!(ConfigFile::from_toml(toml).is_err());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let config = ScopeConfig::new("/data/run1");
        assert_eq!(
            config.resolve(Path::new("00_scan.fits")),
            PathBuf::from("/data/run1/00_scan.fits")
        );
        assert_eq!(
            config.resolve(Path::new("/elsewhere/00_scan.fits")),
            PathBuf::from("/elsewhere/00_scan.fits")
        );
    }
}
