//! Raft geometry: CCD positions and amplifier channels.
//!
//! A raft is a fixed grid of 2 rows × 3 columns of CCDs. Each CCD is read out by
//! 16 amplifiers. CCD positions are written as two digits, row then column
//! (`"00"` .. `"12"`), which is also the prefix used by test-stand file names
//! such as `01_RTM1noise_scan.fits`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of CCD rows in a raft.
pub const RAFT_ROWS: u8 = 2;

/// Number of CCD columns in a raft.
pub const RAFT_COLUMNS: u8 = 3;

/// Number of readout amplifiers per CCD.
pub const CHANNELS_PER_CCD: usize = 16;

/// Position of a CCD in the raft grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CcdPosition {
    /// Row in the raft (0-based)
    pub row: u8,
    /// Column in the raft (0-based)
    pub col: u8,
}

impl CcdPosition {
    /// Create a position, returning `None` when it falls outside the raft.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < RAFT_ROWS && col < RAFT_COLUMNS).then_some(Self { row, col })
    }

    /// All raft positions in row-major order.
    pub fn all() -> impl Iterator<Item = CcdPosition> {
        (0..RAFT_ROWS).flat_map(|row| (0..RAFT_COLUMNS).map(move |col| CcdPosition { row, col }))
    }

    /// Parse the two-digit `RC_` prefix of a file name, if it names a raft position.
    pub fn from_file_prefix(file_name: &str) -> Option<Self> {
        let bytes = file_name.as_bytes();
        if bytes.len() < 3 || bytes[2] != b'_' {
            return None;
        }
        file_name[..2].parse().ok()
    }

    /// Two-digit label (`"01"`).
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CcdPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

impl FromStr for CcdPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .trim()
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| format!("CCD position '{}' must be two digits", s))?;
        match digits.as_slice() {
            [row, col] => CcdPosition::new(*row, *col).ok_or_else(|| {
                format!(
                    "CCD position '{}' outside the {}x{} raft",
                    s, RAFT_ROWS, RAFT_COLUMNS
                )
            }),
            _ => Err(format!("CCD position '{}' must be two digits", s)),
        }
    }
}

impl TryFrom<String> for CcdPosition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CcdPosition> for String {
    fn from(pos: CcdPosition) -> Self {
        pos.to_string()
    }
}

/// Which amplifier channels a request covers.
///
/// Accepts a single index, `"all"`, or a half-open range such as `"0..8"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChannelSpec", into = "String")]
pub enum ChannelSelection {
    /// One channel
    Single(usize),
    /// Half-open range `start..end`
    Range {
        /// First channel
        start: usize,
        /// One past the last channel
        end: usize,
    },
}

impl Default for ChannelSelection {
    fn default() -> Self {
        ChannelSelection::all()
    }
}

impl ChannelSelection {
    /// Every channel of a CCD.
    pub fn all() -> Self {
        ChannelSelection::Range {
            start: 0,
            end: CHANNELS_PER_CCD,
        }
    }

    /// Channel indices in ascending order.
    pub fn channels(&self) -> Vec<usize> {
        match *self {
            ChannelSelection::Single(c) => vec![c],
            ChannelSelection::Range { start, end } => (start..end).collect(),
        }
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelection::Single(c) => write!(f, "{}", c),
            ChannelSelection::Range { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

impl FromStr for ChannelSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ChannelSelection::all());
        }
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid channel '{}'", v))
        };
        match s.split_once("..") {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start >= end {
                    return Err(format!("empty channel range '{}'", s));
                }
                Ok(ChannelSelection::Range { start, end })
            }
            None => Ok(ChannelSelection::Single(parse(s)?)),
        }
    }
}

impl From<ChannelSelection> for String {
    fn from(selection: ChannelSelection) -> Self {
        selection.to_string()
    }
}

/// Serialized forms of a channel selection: an integer or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChannelSpec {
    Index(usize),
    Text(String),
}

impl TryFrom<ChannelSpec> for ChannelSelection {
    type Error = String;

    fn try_from(spec: ChannelSpec) -> Result<Self, Self::Error> {
        match spec {
            ChannelSpec::Index(c) => Ok(ChannelSelection::Single(c)),
            ChannelSpec::Text(s) => s.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_positions_row_major() {
        let labels: Vec<String> = CcdPosition::all().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["00", "01", "02", "10", "11", "12"]);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("12".parse::<CcdPosition>().unwrap(), CcdPosition { row: 1, col: 2 });
        assert!("13".parse::<CcdPosition>().is_err());
        assert!("20".parse::<CcdPosition>().is_err());
        assert!("1".parse::<CcdPosition>().is_err());
    }

    #[test]
    fn test_position_from_file_prefix() {
        assert_eq!(
            CcdPosition::from_file_prefix("01_test-cj-mod3_scan.fits"),
            CcdPosition::new(0, 1)
        );
        assert_eq!(CcdPosition::from_file_prefix("Image_R00.Reb0.dat"), None);
        assert_eq!(CcdPosition::from_file_prefix("25_out_of_raft.fits"), None);
    }

    #[test]
    fn test_channel_selection_parse() {
        assert_eq!("3".parse::<ChannelSelection>().unwrap().channels(), vec![3]);
        assert_eq!("all".parse::<ChannelSelection>().unwrap().channels().len(), 16);
        assert_eq!(
            "4..7".parse::<ChannelSelection>().unwrap().channels(),
            vec![4, 5, 6]
        );
        assert!("7..4".parse::<ChannelSelection>().is_err());
    }
}
