use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use raftscope::container::{self, ContainerMetadata};
use raftscope::layout::CcdPosition;

#[derive(Serialize)]
struct ChannelInfo {
    index: usize,
    name: String,
    samples: usize,
}

#[derive(Serialize)]
struct ContainerInfo {
    path: PathBuf,
    ccd: Option<CcdPosition>,
    #[serde(flatten)]
    metadata: ContainerMetadata,
    channels: Vec<ChannelInfo>,
}

/// Display information about a scan container
pub fn run(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let scan = container::open(file)
        .with_context(|| format!("Failed to open scan container: {}", file.display()))?;
    let mut channels = Vec::with_capacity(scan.channel_count());
    for index in 0..scan.channel_count() {
        channels.push(ChannelInfo {
            index,
            name: scan.channel_name(index),
            samples: scan.declared_len(index)?,
        });
    }
    let info = ContainerInfo {
        path: file.to_path_buf(),
        ccd: file
            .file_name()
            .and_then(|name| CcdPosition::from_file_prefix(&name.to_string_lossy())),
        metadata: scan.metadata().clone(),
        channels,
    };
    drop(scan);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Scan Container Information");
    println!("==========================");
    println!("File: {}", info.path.display());
    println!();
    println!("Format:        {}", info.metadata.format);
    println!("Readout mode:  {}", info.metadata.readout_mode);
    if let Some(ccd) = info.ccd {
        println!("CCD:           {}", ccd);
    }
    if let Some(period) = info.metadata.sample_period_ns {
        println!("Sample period: {} ns", period);
    }
    if let Some(sequence) = &info.metadata.sequence_name {
        println!("Sequence:      {}", sequence);
    }
    if let Some(date) = info.metadata.date_obs {
        println!("DATE-OBS:      {}", date);
    }
    println!();

    println!("Channels ({}):", info.channels.len());
    for channel in &info.channels {
        println!("  {:3}. {:<12} {} samples", channel.index, channel.name, channel.samples);
    }

    Ok(())
}
