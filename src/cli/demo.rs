use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use raftscope::demo::{write_demo, DemoOptions};
use raftscope::layout::CcdPosition;

/// Generate a synthetic raft of scan-mode files
pub fn run(output: PathBuf, cycles: usize, missing: Vec<CcdPosition>) -> Result<()> {
    if cycles == 0 {
        anyhow::bail!("--cycles must be at least 1");
    }
    info!("Writing demo raft to {}", output.display());

    let options = DemoOptions { cycles, missing };
    let files = write_demo(&output, &options)
        .with_context(|| format!("Failed to write demo data to {}", output.display()))?;

    println!("Demo data written to {}", output.display());
    println!("  sequences: {}", files.sequences.len());
    println!("  raft files: {}", files.raft.len());
    println!("  alternate acquisition: {}", files.alternate.display());
    println!("  requests: {}", files.requests.display());
    println!();
    println!("Try:");
    println!(
        "  raftscope --data-dir {} --seq demo.seq raft '{{ccd}}_demo-scan.fits' --mosaic",
        output.display()
    );
    println!(
        "  raftscope --data-dir {} --seq demo.seq --batch run requests.toml",
        output.display()
    );

    Ok(())
}
