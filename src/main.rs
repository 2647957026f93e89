//! raftscope CLI
//!
//! Usage:
//!   raftscope combined <FIRST> <SECOND> [--channel N] [--ccd RC]
//!   raftscope scan <FILE> [--channels 0..8]
//!   raftscope raft <PATTERN> [--mosaic]
//!   raftscope compare <FILE>... --labels a,b [--seqs s1,s2]
//!   raftscope run <REQUESTS.toml>
//!   raftscope info <FILE> [--json]
//!   raftscope sequence <FILE>
//!   raftscope demo <DIR>
//!
//! Global options: --config, --data-dir, --seq, --function, --output-dir,
//! --batch, --normalize, -v/-vv

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbose);
    cli::dispatch(cli)
}
