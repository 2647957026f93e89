use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use raftscope::align::Normalization;
use raftscope::display::{DisplayRequest, GridOutput};
use raftscope::layout::{CcdPosition, ChannelSelection};

mod config;
mod demo;
mod display;
mod info;
mod sequence;

/// raftscope - Scan-mode trace comparison for CCD raft readout tests
#[derive(Parser)]
#[command(name = "raftscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    scope: ScopeArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Session options shared by every display command.
#[derive(Args, Debug, Default)]
pub struct ScopeArgs {
    /// TOML config file with a [scope] table
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory relative source paths are resolved against
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Sequencer file giving the time axis
    #[arg(long = "seq", value_name = "FILE", global = true)]
    sequence: Option<PathBuf>,

    /// Sequencer function describing one readout cycle
    #[arg(long, value_name = "NAME", global = true)]
    function: Option<String>,

    /// Directory batch figures are written to
    #[arg(long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Write figures to the output directory instead of displaying them
    #[arg(long, global = true)]
    batch: bool,

    /// Normalization applied to aligned traces
    #[arg(long, value_enum, global = true)]
    normalize: Option<NormalizeArg>,

    /// Upper bound on plotted points per series
    #[arg(long, value_name = "N", global = true)]
    max_points: Option<usize>,
}

/// Trace normalization mode.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum NormalizeArg {
    /// Raw ADU values
    None,
    /// Subtract each trace's mean
    Offset,
    /// Subtract the mean and divide by the standard deviation
    Standardize,
}

impl From<NormalizeArg> for Normalization {
    fn from(arg: NormalizeArg) -> Self {
        match arg {
            NormalizeArg::None => Normalization::None,
            NormalizeArg::Offset => Normalization::Offset,
            NormalizeArg::Standardize => Normalization::Standardize,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Overlay two scan files channel by channel, with the clock sequence beneath
    Combined {
        /// First scan file
        #[arg(value_name = "FIRST")]
        first: PathBuf,

        /// Second scan file
        #[arg(value_name = "SECOND")]
        second: PathBuf,

        /// Single channel to display
        #[arg(long, conflicts_with = "channels")]
        channel: Option<usize>,

        /// Channel range, e.g. "0..8" or "all"
        #[arg(long)]
        channels: Option<ChannelSelection>,

        /// CCD position (RC) when the file names don't carry one
        #[arg(long, value_name = "RC")]
        ccd: Option<CcdPosition>,
    },

    /// Plot the channels of one scan file
    Scan {
        /// Scan file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Channel range, e.g. "0..8" or "all"
        #[arg(long, default_value = "all")]
        channels: ChannelSelection,
    },

    /// Plot every CCD of a raft from a file name pattern
    Raft {
        /// File name with a CCD prefix, or with "{ccd}" where the prefix goes
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// One mosaic figure instead of one figure per CCD
        #[arg(long)]
        mosaic: bool,

        /// Channel range, e.g. "0..8" or "all"
        #[arg(long, default_value = "all")]
        channels: ChannelSelection,
    },

    /// Compare several labelled scan files channel by channel
    Compare {
        /// Scan files
        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// One label per file, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Sequencer files, one shared or one per file, comma separated
        #[arg(long, value_delimiter = ',')]
        seqs: Vec<PathBuf>,

        /// Channel range, e.g. "0..8" or "all"
        #[arg(long, default_value = "all")]
        channels: ChannelSelection,
    },

    /// Run the display requests listed in a TOML file
    Run {
        /// Request file with [[request]] tables
        #[arg(value_name = "REQUESTS")]
        requests: PathBuf,
    },

    /// Show the format, channels and metadata of a scan container
    Info {
        /// Scan file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the readout cycle parsed from a sequencer file
    Sequence {
        /// Sequencer file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write a synthetic raft of scan files and matching sequencer files
    Demo {
        /// Output directory
        #[arg(value_name = "DIR", default_value = "raftscope-demo")]
        output: PathBuf,

        /// Readout cycles per file
        #[arg(long, default_value_t = 50)]
        cycles: usize,

        /// Raft positions to leave out, comma separated
        #[arg(long, value_delimiter = ',', value_name = "RC")]
        missing: Vec<CcdPosition>,
    },
}

/// Initialize env_logger from the `-v` count. `RUST_LOG` takes precedence.
pub fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let scope = cli.scope;
    match cli.command {
        Commands::Combined {
            first,
            second,
            channel,
            channels,
            ccd,
        } => {
            let channels = channel
                .map(ChannelSelection::Single)
                .or(channels)
                .unwrap_or_default();
            let request = DisplayRequest::Combined {
                first,
                second,
                channels,
                ccd,
                sequence: None,
            };
            display::run(config::build(&scope)?, vec![request])
        }
        Commands::Scan { file, channels } => display::run(
            config::build(&scope)?,
            vec![DisplayRequest::Scan {
                source: file,
                channels,
            }],
        ),
        Commands::Raft {
            pattern,
            mosaic,
            channels,
        } => {
            let output = if mosaic {
                GridOutput::Mosaic
            } else {
                GridOutput::PerCcd
            };
            display::run(
                config::build(&scope)?,
                vec![DisplayRequest::Grid {
                    pattern,
                    output,
                    channels,
                }],
            )
        }
        Commands::Compare {
            files,
            labels,
            seqs,
            channels,
        } => display::run(
            config::build(&scope)?,
            vec![DisplayRequest::Multi {
                sources: files,
                labels,
                sequences: seqs,
                channels,
            }],
        ),
        Commands::Run { requests } => display::run_file(config::build(&scope)?, &requests),
        Commands::Info { file, json } => info::run(&config::build(&scope)?.resolve(&file), json),
        Commands::Sequence { file } => {
            let config = config::build(&scope)?;
            sequence::run(&config.resolve(&file), config.sequence_function.as_deref())
        }
        Commands::Demo {
            output,
            cycles,
            missing,
        } => demo::run(output, cycles, missing),
    }
}
