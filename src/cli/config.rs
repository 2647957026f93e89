//! Session configuration from defaults, an optional TOML file and CLI flags.
//!
//! ```toml
//! # raftscope.toml
//! [scope]
//! data_dir = "/data/RTM1new_mod50"
//! sequence = "seq/scan_mode.seq"
//! output_dir = "plots"
//! interactive = false
//! normalization = "offset"
//! ```
//!
//! Flags override file values. Without `--batch` or `interactive = false` the
//! CLI displays figures.

use anyhow::{Context, Result};

use raftscope::config::{ConfigFile, ScopeConfig};

use super::ScopeArgs;

/// Build the session configuration for one invocation.
pub fn build(args: &ScopeArgs) -> Result<ScopeConfig> {
    let mut config = ScopeConfig::default().with_interactive(true);

    if let Some(path) = &args.config {
        let file = ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        config.apply(&file.scope);
    }

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(sequence) = &args.sequence {
        config.sequence_file = Some(sequence.clone());
    }
    if let Some(function) = &args.function {
        config.sequence_function = Some(function.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.batch {
        config.interactive = false;
    }
    if let Some(normalize) = args.normalize {
        config.normalization = normalize.into();
    }
    if let Some(max_points) = args.max_points {
        config.max_points = max_points.max(2);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use raftscope::align::Normalization;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> ScopeArgs {
        Cli::try_parse_from(args).unwrap().scope
    }

    #[test]
    fn test_defaults_are_interactive() {
        let config = build(&parse(&["raftscope", "scan", "00_a-scan.fits"])).unwrap();
        assert!(config.interactive);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.normalization, Normalization::None);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raftscope.toml");
        std::fs::write(
            &path,
            "[scope]\ndata_dir = \"/from/file\"\noutput_dir = \"file-plots\"\nnormalization = \"offset\"\n",
        )
        .unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let config = build(&parse(&[
            "raftscope",
            "--config",
            &config_arg,
            "--output-dir",
            "cli-plots",
            "--batch",
            "scan",
            "00_a-scan.fits",
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.output_dir, PathBuf::from("cli-plots"));
        assert_eq!(config.normalization, Normalization::Offset);
        assert!(!config.interactive);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = build(&parse(&[
            "raftscope",
            "raft",
            "{ccd}_a-scan.fits",
            "--seq",
            "scan.seq",
            "--normalize",
            "standardize",
        ]))
        .unwrap();
        assert_eq!(config.sequence_file, Some(PathBuf::from("scan.seq")));
        assert_eq!(config.normalization, Normalization::Standardize);
    }

    #[test]
    fn test_missing_config_file() {
        let err = build(&parse(&["raftscope", "--config", "/nonexistent/raftscope.toml", "run", "r.toml"]))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load config file"));
    }
}
