//! Legacy REB raw dumps.
//!
//! Early scan-mode acquisitions were saved straight from the REB as headerless
//! `.dat` files: little-endian 32-bit words, one frame of 16 words per sample
//! (one word per amplifier). Each word carries an 18-bit ADC value; the upper
//! 14 bits are always zero, which is what identifies the format.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{ContainerError, ContainerFormat, ContainerMetadata, ReadoutMode, ScanContainer};
use crate::layout::CHANNELS_PER_CCD;

/// Bytes per ADC word
pub const WORD_BYTES: usize = 4;

/// Bytes per frame (one word per channel)
pub const FRAME_BYTES: usize = WORD_BYTES * CHANNELS_PER_CCD;

/// Frames inspected when recognising the format
pub const SNIFF_FRAMES: usize = 256;

/// Mask of the ADC value bits
pub const ADC_MASK: u32 = (1 << 18) - 1;

/// Check that the leading bytes and length are consistent with a REB raw dump.
pub fn check_reb_raw(prefix: &[u8], file_len: u64) -> Result<(), String> {
    if file_len == 0 {
        return Err("file is empty".to_string());
    }
    if file_len % FRAME_BYTES as u64 != 0 {
        return Err(format!(
            "not FITS, and length {} is not a multiple of the {}-byte REB raw frame",
            file_len, FRAME_BYTES
        ));
    }
    let inspected = prefix.len() - prefix.len() % WORD_BYTES;
    let mut words = &prefix[..inspected];
    let mut index = 0usize;
    while let Ok(word) = words.read_u32::<LittleEndian>() {
        if word & !ADC_MASK != 0 {
            return Err(format!(
                "not FITS, and word {} (0x{:08x}) has bits set above the 18-bit ADC range",
                index, word
            ));
        }
        index += 1;
    }
    Ok(())
}

/// A legacy REB raw dump opened for reading.
pub struct RawContainer {
    path: PathBuf,
    frames: usize,
    metadata: ContainerMetadata,
}

impl RawContainer {
    /// Open a raw dump. Only the length is read here; samples are read per channel.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file_len = std::fs::metadata(path)
            .map_err(|e| ContainerError::io(path, e))?
            .len();
        if file_len % FRAME_BYTES as u64 != 0 {
            return Err(ContainerError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("length {} is not a whole number of frames", file_len),
            });
        }
        let mut metadata = ContainerMetadata::new(ContainerFormat::RebRaw);
        metadata.readout_mode = ReadoutMode::Scan;
        Ok(Self {
            path: path.to_path_buf(),
            frames: (file_len / FRAME_BYTES as u64) as usize,
            metadata,
        })
    }
}

impl ScanContainer for RawContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    fn channel_count(&self) -> usize {
        CHANNELS_PER_CCD
    }

    fn declared_len(&self, channel: usize) -> Result<usize, ContainerError> {
        self.check_channel(channel)?;
        Ok(self.frames)
    }

    fn read_channel(&mut self, channel: usize) -> Result<Vec<f64>, ContainerError> {
        self.check_channel(channel)?;
        let file = File::open(&self.path).map_err(|e| ContainerError::io(&self.path, e))?;
        let mut reader = BufReader::new(file);
        let mut frame = [0u8; FRAME_BYTES];
        let offset = channel * WORD_BYTES;

        let mut samples = Vec::with_capacity(self.frames);
        for _ in 0..self.frames {
            reader
                .read_exact(&mut frame)
                .map_err(|e| ContainerError::io(&self.path, e))?;
            let word = u32::from_le_bytes([
                frame[offset],
                frame[offset + 1],
                frame[offset + 2],
                frame[offset + 3],
            ]);
            samples.push((word & ADC_MASK) as f64);
        }
        Ok(samples)
    }
}

/// Write a REB raw dump from 16 equal-length channels of 18-bit ADC values.
pub fn write_reb_raw(path: &Path, channels: &[Vec<u32>]) -> Result<(), ContainerError> {
    let invalid = |reason: String| ContainerError::InvalidData {
        path: path.to_path_buf(),
        reason,
    };
    if channels.len() != CHANNELS_PER_CCD {
        return Err(invalid(format!(
            "REB raw dumps hold {} channels, got {}",
            CHANNELS_PER_CCD,
            channels.len()
        )));
    }
    let frames = channels[0].len();
    if channels.iter().any(|c| c.len() != frames) {
        return Err(invalid("channels differ in length".to_string()));
    }
    if channels.iter().flatten().any(|&v| v & !ADC_MASK != 0) {
        return Err(invalid("value exceeds the 18-bit ADC range".to_string()));
    }

    let file = File::create(path).map_err(|e| ContainerError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for i in 0..frames {
        for channel in channels {
            out.write_u32::<LittleEndian>(channel[i])
                .map_err(|e| ContainerError::io(path, e))?;
        }
    }
    out.flush().map_err(|e| ContainerError::io(path, e))
}
