//! Multi-extension FITS reader.
//!
//! A FITS file is a sequence of header/data units (HDUs). Headers are 2880-byte
//! blocks of 36 cards of 80 ASCII characters, terminated by an `END` card. Data
//! follows the header, big-endian, padded to a whole block. Scan files carry an
//! empty primary HDU followed by one IMAGE extension per amplifier.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};

use super::{ContainerError, ContainerFormat, ContainerMetadata, ReadoutMode, ScanContainer};
use crate::layout::CHANNELS_PER_CCD;

/// FITS logical record length
pub const BLOCK_LEN: usize = 2880;

/// Header card length
pub const CARD_LEN: usize = 80;

const MAX_HEADER_BLOCKS: usize = 1024;

/// A header keyword value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// `T` / `F`
    Logical(bool),
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Float(f64),
    /// Quoted string, trailing blanks removed
    Text(String),
    /// Keyword present without a value
    Empty,
}

impl HeaderValue {
    fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim_start();
        if let Some(rest) = raw.strip_prefix('\'') {
            let mut text = String::new();
            let mut chars = rest.chars().peekable();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        text.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => text.push(c),
                    None => return Err(format!("unterminated string value '{}'", raw)),
                }
            }
            return Ok(HeaderValue::Text(text.trim_end().to_string()));
        }

        let value = raw.split('/').next().unwrap_or("").trim();
        match value {
            "" => Ok(HeaderValue::Empty),
            "T" => Ok(HeaderValue::Logical(true)),
            "F" => Ok(HeaderValue::Logical(false)),
            _ => {
                if let Ok(i) = value.parse::<i64>() {
                    Ok(HeaderValue::Integer(i))
                } else {
                    value
                        .replace(['D', 'd'], "E")
                        .parse::<f64>()
                        .map(HeaderValue::Float)
                        .map_err(|_| format!("unrecognised value '{}'", value))
                }
            }
        }
    }
}

/// Parsed header of one HDU, cards in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<(String, HeaderValue)>,
}

impl FitsHeader {
    /// Look up the first card with this keyword.
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Integer value of a keyword.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of a keyword, integers widened.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String value of a keyword.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Logical value of a keyword.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            HeaderValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// All cards in file order.
    pub fn cards(&self) -> &[(String, HeaderValue)] {
        &self.cards
    }
}

/// Parse one 80-character card into keyword and value.
///
/// Returns `None` for commentary cards (no `= ` value indicator).
fn parse_card(card: &[u8]) -> Result<Option<(String, HeaderValue)>, String> {
    if !card.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Err("header contains non-ASCII bytes".to_string());
    }
    // All bytes are printable ASCII, so this cannot fail.
    let text = std::str::from_utf8(card).map_err(|e| e.to_string())?;
    let key = text[..8].trim_end().to_string();
    if &text[8..10] != "= " {
        return Ok(None);
    }
    Ok(Some((key, HeaderValue::parse(&text[10..])?)))
}

/// Whether the leading bytes start a FITS primary header (`SIMPLE = T`).
pub fn is_fits(prefix: &[u8]) -> bool {
    if prefix.len() < CARD_LEN {
        return false;
    }
    matches!(
        parse_card(&prefix[..CARD_LEN]),
        Ok(Some((ref key, HeaderValue::Logical(true)))) if key == "SIMPLE"
    )
}

/// What an HDU holds.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HduKind {
    Primary,
    Image,
    Other(String),
}

/// Location and shape of one HDU.
#[derive(Debug, Clone)]
struct Hdu {
    kind: HduKind,
    header: FitsHeader,
    data_offset: u64,
    bitpix: i64,
    axes: Vec<usize>,
    samples: usize,
    data_bytes: u64,
    bscale: f64,
    bzero: f64,
}

impl Hdu {
    fn sample_count(&self) -> usize {
        self.samples
    }
}

fn padded(len: u64) -> u64 {
    let block = BLOCK_LEN as u64;
    (len + block - 1) / block * block
}

/// A FITS scan container opened for reading.
pub struct FitsContainer {
    path: PathBuf,
    reader: BufReader<File>,
    hdus: Vec<Hdu>,
    channels: Vec<usize>,
    metadata: ContainerMetadata,
}

impl FitsContainer {
    /// Open a FITS file and index its HDUs.
    pub fn open(path: &Path) -> Result<Self, ContainerError> {
        let file = File::open(path).map_err(|e| ContainerError::io(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| ContainerError::io(path, e))?
            .len();
        let mut reader = BufReader::new(file);

        let mut hdus = Vec::new();
        let mut offset = 0u64;
        while offset + BLOCK_LEN as u64 <= file_len {
            let hdu = read_hdu(&mut reader, path, hdus.len(), offset)?;
            let end = hdu.data_offset.saturating_add(hdu.data_bytes);
            if end > file_len {
                return Err(ContainerError::Truncated {
                    path: path.to_path_buf(),
                    expected: end,
                    actual: file_len,
                });
            }
            offset = hdu.data_offset + padded(hdu.data_bytes);
            hdus.push(hdu);
        }
        if hdus.is_empty() {
            return Err(ContainerError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: "file shorter than one FITS block".to_string(),
            });
        }
        if offset < file_len {
            debug!(
                "{}: ignoring {} trailing bytes after last HDU",
                path.display(),
                file_len - offset
            );
        }

        for (i, hdu) in hdus.iter().enumerate() {
            if let HduKind::Other(xtension) = &hdu.kind {
                debug!("{}: skipping {} extension at HDU {}", path.display(), xtension, i);
            }
        }

        let images: Vec<usize> = hdus
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind == HduKind::Image && h.sample_count() > 0)
            .map(|(i, _)| i)
            .collect();
        // A single-image file with no extensions keeps its data in the primary HDU.
        let mut channels = if images.is_empty() && hdus[0].sample_count() > 0 {
            vec![0]
        } else {
            images
        };
        if channels.len() > CHANNELS_PER_CCD {
            warn!(
                "{}: {} image extensions, only the first {} are amplifier channels",
                path.display(),
                channels.len(),
                CHANNELS_PER_CCD
            );
            channels.truncate(CHANNELS_PER_CCD);
        }

        let metadata = metadata_from_primary(&hdus[0].header);
        debug!(
            "{}: {} HDUs, {} image channels, readout mode {}",
            path.display(),
            hdus.len(),
            channels.len(),
            metadata.readout_mode
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            hdus,
            channels,
            metadata,
        })
    }

    /// Primary header.
    pub fn primary_header(&self) -> &FitsHeader {
        &self.hdus[0].header
    }

    /// Header of a channel's extension.
    pub fn channel_header(&self, channel: usize) -> Result<&FitsHeader, ContainerError> {
        self.check_channel(channel)?;
        Ok(&self.hdus[self.channels[channel]].header)
    }

    /// Image shape of a channel, fastest axis first (`NAXIS1`, `NAXIS2`, ...).
    pub fn channel_shape(&self, channel: usize) -> Result<&[usize], ContainerError> {
        self.check_channel(channel)?;
        Ok(&self.hdus[self.channels[channel]].axes)
    }
}

impl ScanContainer for FitsContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn declared_len(&self, channel: usize) -> Result<usize, ContainerError> {
        self.check_channel(channel)?;
        Ok(self.hdus[self.channels[channel]].sample_count())
    }

    fn read_channel(&mut self, channel: usize) -> Result<Vec<f64>, ContainerError> {
        self.check_channel(channel)?;
        let hdu = &self.hdus[self.channels[channel]];
        let path = &self.path;

        self.reader
            .seek(SeekFrom::Start(hdu.data_offset))
            .map_err(|e| ContainerError::io(path, e))?;
        let mut bytes = vec![0u8; hdu.data_bytes as usize];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|e| ContainerError::io(path, e))?;

        let count = hdu.sample_count();
        let mut cursor = bytes.as_slice();
        let raw: Vec<f64> = match hdu.bitpix {
            8 => bytes[..count].iter().map(|&b| b as f64).collect(),
            16 => {
                let mut buf = vec![0i16; count];
                cursor.read_i16_into::<BigEndian>(&mut buf).map_err(|e| ContainerError::io(path, e))?;
                buf.into_iter().map(f64::from).collect()
            }
            32 => {
                let mut buf = vec![0i32; count];
                cursor.read_i32_into::<BigEndian>(&mut buf).map_err(|e| ContainerError::io(path, e))?;
                buf.into_iter().map(f64::from).collect()
            }
            64 => {
                let mut buf = vec![0i64; count];
                cursor.read_i64_into::<BigEndian>(&mut buf).map_err(|e| ContainerError::io(path, e))?;
                buf.into_iter().map(|v| v as f64).collect()
            }
            -32 => {
                let mut buf = vec![0f32; count];
                cursor.read_f32_into::<BigEndian>(&mut buf).map_err(|e| ContainerError::io(path, e))?;
                buf.into_iter().map(f64::from).collect()
            }
            -64 => {
                let mut buf = vec![0f64; count];
                cursor.read_f64_into::<BigEndian>(&mut buf).map_err(|e| ContainerError::io(path, e))?;
                buf
            }
            other => {
                return Err(ContainerError::InvalidHeader {
                    path: path.clone(),
                    hdu: self.channels[channel],
                    reason: format!("unsupported BITPIX {}", other),
                })
            }
        };

        let (bscale, bzero) = (hdu.bscale, hdu.bzero);
        if bscale == 1.0 && bzero == 0.0 {
            Ok(raw)
        } else {
            Ok(raw.into_iter().map(|v| bzero + bscale * v).collect())
        }
    }

    fn channel_name(&self, channel: usize) -> String {
        self.channels
            .get(channel)
            .and_then(|&i| self.hdus[i].header.get_str("EXTNAME"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("c{:02}", channel))
    }
}

/// Read the header at `offset` and derive the HDU's data layout.
fn read_hdu(
    reader: &mut BufReader<File>,
    path: &Path,
    index: usize,
    offset: u64,
) -> Result<Hdu, ContainerError> {
    let invalid = |reason: String| ContainerError::InvalidHeader {
        path: path.to_path_buf(),
        hdu: index,
        reason,
    };

    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| ContainerError::io(path, e))?;

    let mut header = FitsHeader::default();
    let mut block = [0u8; BLOCK_LEN];
    let mut blocks = 0usize;
    'blocks: loop {
        if blocks == MAX_HEADER_BLOCKS {
            return Err(invalid("no END card found".to_string()));
        }
        reader.read_exact(&mut block).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => invalid("no END card before end of file".to_string()),
            _ => ContainerError::io(path, e),
        })?;
        blocks += 1;
        for card in block.chunks_exact(CARD_LEN) {
            if card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' ') {
                break 'blocks;
            }
            if let Some(entry) = parse_card(card).map_err(&invalid)? {
                header.cards.push(entry);
            }
        }
    }

    let kind = if index == 0 {
        if header.get_bool("SIMPLE") != Some(true) {
            return Err(invalid("primary header does not start with SIMPLE = T".to_string()));
        }
        HduKind::Primary
    } else {
        match header.get_str("XTENSION") {
            Some(x) if x.trim() == "IMAGE" => HduKind::Image,
            Some(x) => HduKind::Other(x.trim().to_string()),
            None => return Err(invalid("extension header without XTENSION".to_string())),
        }
    };

    let bitpix = header
        .get_int("BITPIX")
        .ok_or_else(|| invalid("missing BITPIX".to_string()))?;
    if ![8, 16, 32, 64, -32, -64].contains(&bitpix) {
        return Err(invalid(format!("invalid BITPIX {}", bitpix)));
    }
    let naxis = header
        .get_int("NAXIS")
        .ok_or_else(|| invalid("missing NAXIS".to_string()))?;
    if !(0..=999).contains(&naxis) {
        return Err(invalid(format!("invalid NAXIS {}", naxis)));
    }
    let axes = (1..=naxis)
        .map(|n| {
            let key = format!("NAXIS{}", n);
            match header.get_int(&key) {
                Some(v) if v >= 0 => Ok(v as usize),
                Some(v) => Err(invalid(format!("negative {} = {}", key, v))),
                None => Err(invalid(format!("missing {}", key))),
            }
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let pcount = header.get_int("PCOUNT").unwrap_or(0).max(0) as u64;
    let gcount = header.get_int("GCOUNT").unwrap_or(1).max(1) as u64;
    let elements = if axes.is_empty() {
        0
    } else {
        axes.iter()
            .try_fold(1u64, |acc, &a| acc.checked_mul(a as u64))
            .ok_or_else(|| invalid(format!("image size {:?} overflows", axes)))?
    };
    let samples = usize::try_from(elements)
        .map_err(|_| invalid(format!("{} samples exceed the address space", elements)))?;
    let data_bytes = if axes.is_empty() {
        0
    } else {
        pcount
            .checked_add(elements)
            .and_then(|n| n.checked_mul(gcount))
            .and_then(|n| n.checked_mul(bitpix.unsigned_abs() / 8))
            .ok_or_else(|| {
                invalid(format!(
                    "data size overflows (BITPIX {}, GCOUNT {}, PCOUNT {}, {} elements)",
                    bitpix, gcount, pcount, elements
                ))
            })?
    };

    Ok(Hdu {
        kind,
        data_offset: offset + (blocks * BLOCK_LEN) as u64,
        bitpix,
        axes,
        samples,
        data_bytes,
        bscale: header.get_float("BSCALE").unwrap_or(1.0),
        bzero: header.get_float("BZERO").unwrap_or(0.0),
        header,
    })
}

fn metadata_from_primary(header: &FitsHeader) -> ContainerMetadata {
    let readout_mode = match header.get_str("READMODE").map(str::to_ascii_uppercase).as_deref() {
        Some("SCAN") => ReadoutMode::Scan,
        Some("IMAGE") => ReadoutMode::Image,
        _ => ReadoutMode::Unknown,
    };
    ContainerMetadata {
        format: ContainerFormat::Fits,
        readout_mode,
        sample_period_ns: header.get_float("CLKPER").filter(|p| *p > 0.0),
        sequence_name: header.get_str("SEQNAME").map(str::to_string),
        date_obs: header.get_str("DATE-OBS").and_then(parse_date_obs),
    }
}

/// Parse a FITS `DATE-OBS` value (`YYYY-MM-DDThh:mm:ss[.sss]` or `YYYY-MM-DD`).
pub fn parse_date_obs(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
