//! Channel Extractor
//!
//! Pulls one amplifier's samples out of a scan container. The container is
//! opened, read and closed within a single call; nothing is held open across
//! alignment or rendering.

use std::path::{Path, PathBuf};

use log::debug;

use crate::container::{self, ContainerError, ContainerFormat};
use crate::layout::CcdPosition;
use crate::trace::{ChannelTrace, SourceId, TraceMetadata};

/// Extract one channel from the container at `path`.
///
/// The CCD position is taken from a two-digit `RC_` file name prefix when
/// present. Fails with [`ContainerError::ChannelIndexOutOfRange`] when the
/// container declares fewer channels and with
/// [`ContainerError::UnsupportedFormat`] when its content is not recognised.
pub fn extract(path: &Path, channel: usize) -> Result<ChannelTrace, ContainerError> {
    let mut scan = container::open(path)?;
    scan.check_channel(channel)?;

    let declared = scan.declared_len(channel)?;
    let samples = scan.read_channel(channel)?;
    if samples.len() != declared {
        return Err(ContainerError::Truncated {
            path: path.to_path_buf(),
            expected: declared as u64,
            actual: samples.len() as u64,
        });
    }
    let metadata = TraceMetadata::from(scan.metadata());
    drop(scan);

    let ccd = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(CcdPosition::from_file_prefix);
    debug!(
        "Extracted {} samples from {}[c{}] ({})",
        samples.len(),
        path.display(),
        channel,
        metadata.format
    );

    Ok(ChannelTrace {
        source: SourceId::new(path, channel),
        samples,
        channel,
        ccd,
        metadata,
    })
}

/// Extract several channels of one container, opening it once.
pub fn extract_channels(path: &Path, channels: &[usize]) -> Result<Vec<ChannelTrace>, ContainerError> {
    let mut scan = container::open(path)?;
    for &channel in channels {
        scan.check_channel(channel)?;
    }
    let metadata = TraceMetadata::from(scan.metadata());
    let ccd = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(CcdPosition::from_file_prefix);

    let mut traces = Vec::with_capacity(channels.len());
    for &channel in channels {
        let samples = scan.read_channel(channel)?;
        traces.push(ChannelTrace {
            source: SourceId::new(path, channel),
            samples,
            channel,
            ccd,
            metadata: metadata.clone(),
        });
    }
    debug!("Extracted {} channels from {}", traces.len(), path.display());
    Ok(traces)
}

/// Sniff every source of one comparison and require a single container format.
///
/// Runs before any samples are read, so a mixed comparison fails fast with
/// [`ContainerError::MixedFormat`].
pub fn probe_formats(paths: &[PathBuf]) -> Result<Option<ContainerFormat>, ContainerError> {
    let mut first: Option<(&PathBuf, ContainerFormat)> = None;
    for path in paths {
        let format = container::probe(path)?;
        match first {
            None => first = Some((path, format)),
            Some((first_path, first_format)) if first_format != format => {
                return Err(ContainerError::MixedFormat {
                    first: first_path.clone(),
                    first_format,
                    other: path.clone(),
                    other_format: format,
                });
            }
            Some(_) => {}
        }
    }
    Ok(first.map(|(_, format)| format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{write_reb_raw, FitsWriter};
    use tempfile::tempdir;

    fn write_fits(path: &Path, channels: usize, len: usize) {
        let mut writer = FitsWriter::new().keyword("READMODE", "SCAN");
        for c in 0..channels {
            let data = (0..len as i32).map(|i| i + c as i32).collect();
            writer = writer.image_i32(&format!("Segment{:02}", c), len, 1, data);
        }
        writer.write(path).unwrap();
    }

    #[test]
    fn test_extract_every_channel_matches_declared_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00_scan.fits");
        write_fits(&path, 16, 64);

        for channel in 0..16 {
            let trace = extract(&path, channel).unwrap();
            assert_eq!(trace.sample_count(), 64);
            assert_eq!(trace.channel, channel);
            assert_eq!(trace.samples[0], channel as f64);
            assert_eq!(trace.ccd, CcdPosition::new(0, 0));
        }
    }

    #[test]
    fn test_extract_channel_sixteen_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00_scan.fits");
        write_fits(&path, 16, 8);

        let err = extract(&path, 16).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::ChannelIndexOutOfRange {
                channel: 16,
                available: 16,
                ..
            }
        ));
        assert!(err.to_string().contains("16 channels available"));
    }

    #[test]
    fn test_extract_channels_opens_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("12_scan.fits");
        write_fits(&path, 4, 10);

        let traces = extract_channels(&path, &[1, 3]).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[1].channel, 3);
        assert_eq!(traces[1].ccd, CcdPosition::new(1, 2));
        assert!(extract_channels(&path, &[0, 4]).is_err());
    }

    #[test]
    fn test_probe_formats_rejects_mixture() {
        let dir = tempdir().unwrap();
        let fits = dir.path().join("00_test-cj-mod2.fits");
        write_fits(&fits, 16, 8);
        let raw = dir.path().join("Image_R00.Reb0_20170320200751.dat");
        let channels: Vec<Vec<u32>> = (0..16).map(|_| vec![1u32; 8]).collect();
        write_reb_raw(&raw, &channels).unwrap();

        assert_eq!(
            probe_formats(&[fits.clone(), fits.clone()]).unwrap(),
            Some(ContainerFormat::Fits)
        );
        match probe_formats(&[raw.clone(), fits.clone()]) {
            Err(ContainerError::MixedFormat {
                first_format,
                other_format,
                ..
            }) => {
                assert_eq!(first_format, ContainerFormat::RebRaw);
                assert_eq!(other_format, ContainerFormat::Fits);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(probe_formats(&[]).unwrap(), None);
    }
}
