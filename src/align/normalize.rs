use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Amplitude normalization applied to aligned samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Samples are plotted as read
    #[default]
    None,
    /// Subtract the mean, so traces with different pedestals overlay
    Offset,
    /// Subtract the mean and divide by the standard deviation
    Standardize,
}

impl Normalization {
    /// Normalize samples in place.
    ///
    /// Empty input is left untouched. A constant trace is only offset, since
    /// it has no spread to divide by.
    pub fn apply(self, samples: &mut [f64]) {
        if self == Normalization::None || samples.is_empty() {
            return;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let scale = match self {
            Normalization::Standardize => {
                let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 && std.is_finite() {
                    1.0 / std
                } else {
                    1.0
                }
            }
            _ => 1.0,
        };
        for v in samples.iter_mut() {
            *v = (*v - mean) * scale;
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::None => "none",
            Normalization::Offset => "offset",
            Normalization::Standardize => "standardize",
        };
        f.write_str(name)
    }
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Normalization::None),
            "offset" => Ok(Normalization::Offset),
            "standardize" | "zscore" => Ok(Normalization::Standardize),
            other => Err(format!(
                "unknown normalization '{}' (expected none, offset or standardize)",
                other
            )),
        }
    }
}
