use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Severity classification applied to an overall index.
///
/// One scheme is picked per deployment and used at every hierarchy level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleScheme {
    /// | Index    | Scale |
    /// |----------|-------|
    /// | <= 50    | 1     |
    /// | <= 100   | 2     |
    /// | <= 200   | 3     |
    /// | <= 300   | 4     |
    /// | <= 400   | 5     |
    /// | > 400    | 6     |
    #[default]
    SixLevel,
    /// Same thresholds, with everything above 300 folded into 5.
    FiveLevel,
}

const SIX_LEVEL_LABELS: [&str; 6] = [
    "Good",
    "Moderate",
    "Unhealthy for Sensitive Groups",
    "Unhealthy",
    "Very Unhealthy",
    "Hazardous",
];

const FIVE_LEVEL_LABELS: [&str; 5] = ["Good", "Moderate", "Poor", "Very Poor", "Severe"];

impl ScaleScheme {
    /// Converts an overall index into a severity scale starting at 1.
    pub fn classify(&self, index: u16) -> u8 {
        let scale = match index {
            i if i <= 50 => 1,
            i if i <= 100 => 2,
            i if i <= 200 => 3,
            i if i <= 300 => 4,
            i if i <= 400 => 5,
            _ => 6,
        };
        scale.min(self.levels())
    }

    pub fn levels(&self) -> u8 {
        match self {
            ScaleScheme::SixLevel => 6,
            ScaleScheme::FiveLevel => 5,
        }
    }

    /// Category name for `scale`, or `"Unknown"` when out of range.
    pub fn label(&self, scale: u8) -> &'static str {
        let labels: &[&'static str] = match self {
            ScaleScheme::SixLevel => &SIX_LEVEL_LABELS,
            ScaleScheme::FiveLevel => &FIVE_LEVEL_LABELS,
        };
        (scale as usize)
            .checked_sub(1)
            .and_then(|i| labels.get(i))
            .copied()
            .unwrap_or("Unknown")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleScheme::SixLevel => "six-level",
            ScaleScheme::FiveLevel => "five-level",
        }
    }
}

impl fmt::Display for ScaleScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScaleScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "six-level" | "6" | "cpcb" => Ok(ScaleScheme::SixLevel),
            "five-level" | "5" => Ok(ScaleScheme::FiveLevel),
            other => Err(Error::UnknownScheme(other.to_string())),
        }
    }
}
