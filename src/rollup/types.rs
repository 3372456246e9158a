//! Data types used by the rollup pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aqi::{AqiResult, PollutantReading};

/// Maximum number of failed identifiers kept in a [`StageReport`].
pub const FAILED_ID_SAMPLE: usize = 10;

/// Geographic granularity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    City,
    Region,
    Country,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::City => "city",
            Level::Region => "region",
            Level::Country => "country",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A reading as handed over by the ingestion side, before any scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// City name; matched against the hierarchy metadata.
    pub location_id: String,
    pub captured_at: DateTime<Utc>,
    pub pollutants: PollutantReading,
    /// Category label supplied by the data provider, if any.
    pub category: Option<String>,
}

impl RawReading {
    pub fn new(location_id: &str, captured_at: DateTime<Utc>, pollutants: PollutantReading) -> Self {
        Self {
            location_id: location_id.to_string(),
            captured_at,
            pollutants,
            category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// An index record for a city, region or country at one timestamp.
///
/// City records come from a raw reading. Region and country records are
/// always derived by aggregating the level below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub level: Level,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: String,
    pub timestamp: DateTime<Utc>,
    pub coordinates: Coordinates,
    pub pollutants: PollutantReading,
    pub aqi: AqiResult,
    pub category: String,
    pub is_country_metro: bool,
    pub is_region_metro: bool,
}

impl LocationRecord {
    /// The most specific name of the location.
    pub fn name(&self) -> &str {
        match self.level {
            Level::City => self.city.as_deref().unwrap_or_default(),
            Level::Region => self.region.as_deref().unwrap_or_default(),
            Level::Country => &self.country,
        }
    }
}

/// Identifies the parent a child record rolls up into.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParentKey {
    Region { region: String, country: String },
    Country { country: String },
}

impl ParentKey {
    pub fn level(&self) -> Level {
        match self {
            ParentKey::Region { .. } => Level::Region,
            ParentKey::Country { .. } => Level::Country,
        }
    }

    /// The grouping selector that produces keys of this shape.
    pub fn group_by(&self) -> GroupBy {
        match self {
            ParentKey::Region { .. } => GroupBy::Region,
            ParentKey::Country { .. } => GroupBy::Country,
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentKey::Region { region, country } => write!(f, "{region}, {country}"),
            ParentKey::Country { country } => f.write_str(country),
        }
    }
}

/// Explicit grouping key selector for one aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    /// Cities grouped by (region, country).
    Region,
    /// Regions grouped by country.
    Country,
}

impl GroupBy {
    pub fn child_level(&self) -> Level {
        match self {
            GroupBy::Region => Level::City,
            GroupBy::Country => Level::Region,
        }
    }

    pub fn parent_level(&self) -> Level {
        match self {
            GroupBy::Region => Level::Region,
            GroupBy::Country => Level::Country,
        }
    }

    /// Parent key of `record`, or `None` if the record is not at the child
    /// level for this selector.
    pub fn key(&self, record: &LocationRecord) -> Option<ParentKey> {
        if record.level != self.child_level() {
            return None;
        }
        match self {
            GroupBy::Region => Some(ParentKey::Region {
                region: record.region.clone()?,
                country: record.country.clone(),
            }),
            GroupBy::Country => Some(ParentKey::Country {
                country: record.country.clone(),
            }),
        }
    }
}

/// What the aggregator needs to know about the parent it is building.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentMetadata {
    pub key: ParentKey,
    pub coordinates: Coordinates,
}

/// Counts for one stage of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// First few identifiers that were dropped.
    pub failed_ids: Vec<String>,
}

impl StageReport {
    pub(crate) fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, id: &str) {
        self.attempted += 1;
        self.failed += 1;
        if self.failed_ids.len() < FAILED_ID_SAMPLE {
            self.failed_ids.push(id.to_string());
        }
    }
}

/// Per-level counts for one ingestion cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub cities: StageReport,
    pub regions: StageReport,
    pub countries: StageReport,
}

/// Everything one ingestion cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupResult {
    pub cities: Vec<LocationRecord>,
    pub regions: Vec<LocationRecord>,
    pub countries: Vec<LocationRecord>,
    pub report: CycleReport,
}

impl RollupResult {
    /// Number of raw readings dropped in the city stage.
    pub fn failed_count(&self) -> usize {
        self.report.cities.failed
    }

    /// The country record of a single-country deployment.
    pub fn country(&self) -> Option<&LocationRecord> {
        self.countries.first()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.report.timestamp
    }
}
