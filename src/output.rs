//! Output formatting and persistence for index records.
//!
//! Supports JSON logging, flat CSV append, and JSON files with optional gzip.

use anyhow::Result;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::aqi::Pollutant;
use crate::rollup::{Level, LocationRecord};

/// One flat CSV row per [`LocationRecord`].
#[derive(Debug, Serialize)]
pub struct RecordRow<'a> {
    pub datetime: DateTime<Utc>,
    pub level: Level,
    pub city: &'a str,
    pub state: &'a str,
    pub country: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: u16,
    pub aqi_scale: u8,
    pub main_pollutant: Pollutant,
    pub category: &'a str,
    pub is_country_metro_city: bool,
    pub is_state_metro_city: bool,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

impl<'a> From<&'a LocationRecord> for RecordRow<'a> {
    fn from(r: &'a LocationRecord) -> Self {
        let p = |pollutant| r.pollutants.get(pollutant);
        RecordRow {
            datetime: r.timestamp,
            level: r.level,
            city: r.city.as_deref().unwrap_or_default(),
            state: r.region.as_deref().unwrap_or_default(),
            country: &r.country,
            latitude: r.coordinates.latitude,
            longitude: r.coordinates.longitude,
            aqi: r.aqi.index,
            aqi_scale: r.aqi.scale,
            main_pollutant: r.aqi.governing,
            category: &r.category,
            is_country_metro_city: r.is_country_metro,
            is_state_metro_city: r.is_region_metro,
            co: p(Pollutant::Co),
            no: p(Pollutant::No),
            no2: p(Pollutant::No2),
            o3: p(Pollutant::O3),
            so2: p(Pollutant::So2),
            pm2_5: p(Pollutant::Pm2_5),
            pm10: p(Pollutant::Pm10),
            nh3: p(Pollutant::Nh3),
        }
    }
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends records as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &Path, records: &[LocationRecord]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for record in records {
        writer.serialize(RecordRow::from(record))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes `value` as JSON to `path`, gzip-compressed when `gzip` is set.
pub fn write_json(path: &Path, value: &impl Serialize, gzip: bool) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;

    let mut file = File::create(path)?;
    if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        file.write_all(&encoder.finish()?)?;
    } else {
        file.write_all(&body)?;
    }

    debug!(path = %path.display(), gzip, "Wrote JSON");
    Ok(())
}
