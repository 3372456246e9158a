//! Error type shared by the index computation and the rollup pipeline.

use crate::aqi::Pollutant;
use crate::rollup::Level;

/// Errors produced by the AQI core.
///
/// `InsufficientData` and `MetadataMissing` are recovered inside the
/// pipeline (the location is dropped and counted). `InvalidGrouping` and
/// `EmptyCycle` reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No pollutant in the reading produced a sub-index.
    #[error("insufficient data to compute an index for {location}")]
    InsufficientData { location: String },

    /// A location has no matching static metadata.
    #[error("no {level} metadata for {key}")]
    MetadataMissing { level: Level, key: String },

    /// Aggregation inputs span more than one parent or timestamp.
    #[error("invalid grouping: {reason}")]
    InvalidGrouping { reason: String },

    /// No city record survived the first stage of a cycle.
    #[error("empty cycle: none of {attempted} readings produced a city record")]
    EmptyCycle {
        attempted: usize,
        failed_ids: Vec<String>,
    },

    /// A breakpoint table failed validation.
    #[error("invalid breakpoints for {pollutant}: {reason}")]
    InvalidBreakpoints { pollutant: Pollutant, reason: String },

    #[error("unknown pollutant: {0}")]
    UnknownPollutant(String),

    #[error("unknown scale scheme: {0}")]
    UnknownScheme(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
