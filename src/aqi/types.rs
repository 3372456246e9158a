//! Data types used by the index computation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::aqi::scale::ScaleScheme;
use crate::error::Error;

/// A pollutant the index knows about.
///
/// Variants are declared in canonical order. `Ord` follows that order, so
/// maps keyed by `Pollutant` iterate canonically and ties between equal
/// sub-indices resolve to the earlier variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    #[serde(rename = "co")]
    Co,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "no2")]
    No2,
    #[serde(rename = "o3")]
    O3,
    #[serde(rename = "so2")]
    So2,
    #[serde(rename = "pm2_5", alias = "pm25")]
    Pm2_5,
    #[serde(rename = "pm10")]
    Pm10,
    #[serde(rename = "nh3")]
    Nh3,
}

impl Pollutant {
    /// Every pollutant, in canonical order.
    pub const ALL: [Pollutant; 8] = [
        Pollutant::Co,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
        Pollutant::Pm2_5,
        Pollutant::Pm10,
        Pollutant::Nh3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No => "no",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::So2 => "so2",
            Pollutant::Pm2_5 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Nh3 => "nh3",
        }
    }

    /// Converts a captured concentration (µg/m³) into the unit the
    /// breakpoint table is expressed in. CO is scored in mg/m³.
    pub fn scoring_value(&self, concentration: f64) -> f64 {
        match self {
            Pollutant::Co => concentration / 1000.0,
            _ => concentration,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pollutant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "co" => Ok(Pollutant::Co),
            "no" => Ok(Pollutant::No),
            "no2" => Ok(Pollutant::No2),
            "o3" => Ok(Pollutant::O3),
            "so2" => Ok(Pollutant::So2),
            "pm2_5" | "pm25" => Ok(Pollutant::Pm2_5),
            "pm10" => Ok(Pollutant::Pm10),
            "nh3" => Ok(Pollutant::Nh3),
            other => Err(Error::UnknownPollutant(other.to_string())),
        }
    }
}

/// Pollutant concentrations captured for one location at one point in time.
///
/// Values are kept as captured (µg/m³, CO included). Absent pollutants are
/// simply not in the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollutantReading(BTreeMap<Pollutant, f64>);

impl PollutantReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, pollutant: Pollutant, concentration: f64) -> Self {
        self.0.insert(pollutant, concentration);
        self
    }

    pub fn get(&self, pollutant: Pollutant) -> Option<f64> {
        self.0.get(&pollutant).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates `(pollutant, concentration)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }
}

impl FromIterator<(Pollutant, f64)> for PollutantReading {
    fn from_iter<I: IntoIterator<Item = (Pollutant, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The sub-index one pollutant contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubIndexResult {
    pub pollutant: Pollutant,
    pub sub_index: u16,
}

/// The resolved index for one reading.
///
/// `index` is the maximum of `sub_indices` and `governing` is the first
/// pollutant (canonical order) reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AqiResult {
    pub index: u16,
    pub governing: Pollutant,
    pub scale: u8,
    pub sub_indices: Vec<SubIndexResult>,
}

impl AqiResult {
    /// Human-readable category of this result under `scheme`.
    pub fn category(&self, scheme: ScaleScheme) -> &'static str {
        scheme.label(self.scale)
    }

    pub fn sub_index_of(&self, pollutant: Pollutant) -> Option<u16> {
        self.sub_indices
            .iter()
            .find(|s| s.pollutant == pollutant)
            .map(|s| s.sub_index)
    }
}
