use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::fits::{HeaderValue, BLOCK_LEN, CARD_LEN};
use super::ContainerError;

/// Pixel data of one IMAGE extension.
#[derive(Debug, Clone)]
enum ImageData {
    I32(Vec<i32>),
    /// Unsigned 16-bit data stored as BITPIX 16 with `BZERO = 32768`
    U16(Vec<u16>),
}

#[derive(Debug, Clone)]
struct ImageExtension {
    name: String,
    width: usize,
    height: usize,
    data: ImageData,
}

/// Writes scan-mode multi-extension FITS files.
///
/// The primary HDU carries no data; each added image becomes one IMAGE
/// extension, i.e. one amplifier channel.
///
/// ```rust,no_run
/// use raftscope::container::FitsWriter;
///
/// let samples: Vec<i32> = (0..1000).collect();
/// FitsWriter::new()
///     .keyword("READMODE", "SCAN")
///     .keyword("CLKPER", 10.0)
///     .image_i32("Segment10", 100, 10, samples)
///     .write(std::path::Path::new("00_scan.fits"))?;
/// # Ok::<(), raftscope::container::ContainerError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FitsWriter {
    primary: Vec<(String, HeaderValue)>,
    images: Vec<ImageExtension>,
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Text(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Text(s)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Integer(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Logical(v)
    }
}

impl FitsWriter {
    /// Create a writer with an empty primary header
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary header keyword.
    pub fn keyword(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.primary.push((key.to_string(), value.into()));
        self
    }

    /// Add a 32-bit integer image extension. `data` is row-major, `width` fastest.
    pub fn image_i32(mut self, name: &str, width: usize, height: usize, data: Vec<i32>) -> Self {
        self.images.push(ImageExtension {
            name: name.to_string(),
            width,
            height,
            data: ImageData::I32(data),
        });
        self
    }

    /// Add an unsigned 16-bit image extension.
    pub fn image_u16(mut self, name: &str, width: usize, height: usize, data: Vec<u16>) -> Self {
        self.images.push(ImageExtension {
            name: name.to_string(),
            width,
            height,
            data: ImageData::U16(data),
        });
        self
    }

    /// Write the file.
    pub fn write(&self, path: &Path) -> Result<(), ContainerError> {
        for image in &self.images {
            let len = match &image.data {
                ImageData::I32(d) => d.len(),
                ImageData::U16(d) => d.len(),
            };
            if len != image.width * image.height {
                return Err(ContainerError::InvalidData {
                    path: path.to_path_buf(),
                    reason: format!(
                        "image {} has {} samples, expected {}x{}",
                        image.name, len, image.width, image.height
                    ),
                });
            }
        }

        let file = File::create(path).map_err(|e| ContainerError::io(path, e))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|_| out.flush())
            .map_err(|e| ContainerError::io(path, e))
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let mut primary = vec![
            ("SIMPLE".to_string(), HeaderValue::Logical(true)),
            ("BITPIX".to_string(), HeaderValue::Integer(8)),
            ("NAXIS".to_string(), HeaderValue::Integer(0)),
            ("EXTEND".to_string(), HeaderValue::Logical(true)),
        ];
        primary.extend(self.primary.iter().cloned());
        write_header(out, &primary)?;

        for image in &self.images {
            let (bitpix, bzero, bytes): (i64, Option<i64>, Vec<u8>) = match &image.data {
                ImageData::I32(d) => (32, None, d.iter().flat_map(|v| v.to_be_bytes()).collect()),
                ImageData::U16(d) => (
                    16,
                    Some(32768),
                    d.iter()
                        .flat_map(|&v| ((v as i32 - 32768) as i16).to_be_bytes())
                        .collect(),
                ),
            };
            let mut cards = vec![
                ("XTENSION".to_string(), HeaderValue::from("IMAGE")),
                ("BITPIX".to_string(), HeaderValue::Integer(bitpix)),
                ("NAXIS".to_string(), HeaderValue::Integer(2)),
                ("NAXIS1".to_string(), HeaderValue::Integer(image.width as i64)),
                ("NAXIS2".to_string(), HeaderValue::Integer(image.height as i64)),
                ("PCOUNT".to_string(), HeaderValue::Integer(0)),
                ("GCOUNT".to_string(), HeaderValue::Integer(1)),
            ];
            if let Some(bzero) = bzero {
                cards.push(("BZERO".to_string(), HeaderValue::Integer(bzero)));
                cards.push(("BSCALE".to_string(), HeaderValue::Integer(1)));
            }
            cards.push(("EXTNAME".to_string(), HeaderValue::from(image.name.as_str())));
            write_header(out, &cards)?;

            out.write_all(&bytes)?;
            pad_block(out, bytes.len(), 0)?;
        }
        Ok(())
    }
}

fn format_card(key: &str, value: &HeaderValue) -> String {
    let value = match value {
        HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
        HeaderValue::Integer(i) => format!("{:>20}", i),
        HeaderValue::Float(f) => format!("{:>20}", format_float(*f)),
        HeaderValue::Text(s) => format!("'{:<8}'", s.replace('\'', "''")),
        HeaderValue::Empty => String::new(),
    };
    let mut card = format!("{:<8}= {}", key, value);
    card.truncate(CARD_LEN);
    format!("{:<width$}", card, width = CARD_LEN)
}

fn format_float(f: f64) -> String {
    let s = format!("{:?}", f);
    if s.contains(['.', 'e', 'E']) || !f.is_finite() {
        s.to_uppercase()
    } else {
        format!("{}.0", s)
    }
}

fn write_header<W: Write>(out: &mut W, cards: &[(String, HeaderValue)]) -> std::io::Result<()> {
    let mut written = 0;
    for (key, value) in cards {
        out.write_all(format_card(key, value).as_bytes())?;
        written += CARD_LEN;
    }
    out.write_all(format!("{:<width$}", "END", width = CARD_LEN).as_bytes())?;
    written += CARD_LEN;
    pad_block(out, written, b' ')
}

fn pad_block<W: Write>(out: &mut W, written: usize, fill: u8) -> std::io::Result<()> {
    let rem = written % BLOCK_LEN;
    if rem != 0 {
        out.write_all(&vec![fill; BLOCK_LEN - rem])?;
    }
    Ok(())
}
