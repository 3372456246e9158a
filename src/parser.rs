//! JSON parser for provider reading payloads.
//!
//! The expected shape is an array of per-city captures:
//!
//! ```json
//! [{
//!   "city": "Kochi",
//!   "datetime": "2025-09-01T06:00:00Z",
//!   "category": "Good",
//!   "data": { "list": [{ "components": { "co": 230.3, "pm2_5": 12.1 } }] }
//! }]
//! ```
//!
//! `category` is optional. Only the first entry of `list` is used. Component
//! values may be numbers or numeric strings such as `"12.5"`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::aqi::{Pollutant, PollutantReading};
use crate::error::Result;
use crate::rollup::RawReading;

#[derive(Debug, Deserialize)]
struct Capture {
    city: String,
    datetime: DateTime<Utc>,
    #[serde(default)]
    category: Option<String>,
    data: CaptureData,
}

#[derive(Debug, Deserialize)]
struct CaptureData {
    #[serde(default)]
    list: Vec<CaptureEntry>,
}

#[derive(Debug, Deserialize)]
struct CaptureEntry {
    #[serde(default)]
    components: BTreeMap<String, Option<Concentration>>,
}

/// A component value as providers send it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Concentration {
    Number(f64),
    Text(String),
}

impl Concentration {
    fn value(&self) -> Option<f64> {
        match self {
            Concentration::Number(v) => Some(*v),
            Concentration::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Decodes a JSON array of captures into [`RawReading`]s.
///
/// Unknown component names, null values and non-numeric strings are skipped;
/// they never become zero concentrations. When both a pollutant's canonical
/// name and its alias are present (`pm2_5` and `pm25`), the canonical one wins.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON array of captures.
pub fn parse_readings(bytes: &[u8]) -> Result<Vec<RawReading>> {
    let captures: Vec<Capture> = serde_json::from_slice(bytes)?;
    Ok(captures.into_iter().map(into_raw_reading).collect())
}

fn into_raw_reading(capture: Capture) -> RawReading {
    let components = capture
        .data
        .list
        .into_iter()
        .next()
        .map(|entry| entry.components)
        .unwrap_or_default();

    let mut pollutants = PollutantReading::new();
    for (name, raw) in components {
        let Ok(pollutant) = name.parse::<Pollutant>() else {
            warn!(city = %capture.city, component = %name, "Skipping unknown component");
            continue;
        };
        let Some(raw) = raw else { continue };
        let Some(value) = raw.value() else {
            warn!(city = %capture.city, component = %name, value = ?raw, "Skipping non-numeric component");
            continue;
        };
        let canonical = name == pollutant.as_str();
        if pollutants.get(pollutant).is_some() {
            warn!(city = %capture.city, component = %name, "Duplicate component, keeping {pollutant}");
            if !canonical {
                continue;
            }
        }
        pollutants = pollutants.with(pollutant, value);
    }

    RawReading {
        location_id: capture.city,
        captured_at: capture.datetime,
        pollutants,
        category: capture.category,
    }
}

/// Parses a single reading given as a flat JSON object, e.g.
/// `{"pm2_5": 35, "co": 1200}`.
pub fn parse_pollutants(json: &str) -> Result<PollutantReading> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
        {
            "city": "Kochi",
            "datetime": "2025-09-01T06:00:00Z",
            "data": { "list": [{ "components": {
                "co": 230.3, "no": 0.1, "no2": 4.2, "o3": 61.0,
                "so2": 2.3, "pm2_5": 12.1, "pm10": 18.4, "nh3": 1.9
            } }] }
        },
        {
            "city": "Pune",
            "datetime": "2025-09-01T06:00:00Z",
            "category": "Moderate",
            "data": { "list": [{ "components": { "pm2_5": null, "pm10": 70, "lead": 3 } }] }
        },
        {
            "city": "Leh",
            "datetime": "2025-09-01T06:00:00Z",
            "data": { "list": [] }
        }
    ]"#;

    #[test]
    fn test_parse_sample() {
        let readings = parse_readings(SAMPLE.as_bytes()).unwrap();
        assert_eq!(readings.len(), 3);

        let kochi = &readings[0];
        assert_eq!(kochi.location_id, "Kochi");
        assert_eq!(kochi.captured_at, Utc.with_ymd_and_hms(2025, 9, 1, 6, 0, 0).unwrap());
        assert_eq!(kochi.pollutants.len(), 8);
        assert_eq!(kochi.pollutants.get(Pollutant::Co), Some(230.3));
        assert_eq!(kochi.category, None);

        let pune = &readings[1];
        assert_eq!(pune.pollutants.len(), 1);
        assert_eq!(pune.pollutants.get(Pollutant::Pm2_5), None);
        assert_eq!(pune.category.as_deref(), Some("Moderate"));

        assert!(readings[2].pollutants.is_empty());
    }

    #[test]
    fn test_canonical_name_beats_alias() {
        let json = |components: &str| {
            format!(
                r#"[{{"city": "Kochi", "datetime": "2025-09-01T06:00:00Z",
                     "data": {{ "list": [{{ "components": {components} }}] }} }}]"#
            )
        };

        for components in [r#"{"pm25": 99, "pm2_5": 12}"#, r#"{"pm2_5": 12, "pm25": 99}"#] {
            let readings = parse_readings(json(components).as_bytes()).unwrap();
            assert_eq!(readings[0].pollutants.get(Pollutant::Pm2_5), Some(12.0));
        }

        let readings = parse_readings(json(r#"{"pm25": 99}"#).as_bytes()).unwrap();
        assert_eq!(readings[0].pollutants.get(Pollutant::Pm2_5), Some(99.0));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let json = r#"[{
            "city": "Kochi",
            "datetime": "2025-09-01T06:00:00Z",
            "data": { "list": [{ "components": { "pm2_5": "12.5", "pm10": " 40 ", "co": "n/a", "so2": 3 } }] }
        }]"#;

        let readings = parse_readings(json.as_bytes()).unwrap();
        let pollutants = &readings[0].pollutants;
        assert_eq!(pollutants.get(Pollutant::Pm2_5), Some(12.5));
        assert_eq!(pollutants.get(Pollutant::Pm10), Some(40.0));
        assert_eq!(pollutants.get(Pollutant::Co), None);
        assert_eq!(pollutants.get(Pollutant::So2), Some(3.0));
    }

    #[test]
    fn test_parse_invalid_bytes() {
        assert!(parse_readings(&[0xFF, 0xFE, 0x00, 0x01]).is_err());
        assert!(parse_readings(br#"{"city": "Kochi"}"#).is_err());
    }

    #[test]
    fn test_parse_pollutants() {
        let reading = parse_pollutants(r#"{"pm2_5": 35, "co": 1200}"#).unwrap();
        assert_eq!(reading.get(Pollutant::Pm2_5), Some(35.0));
        assert!(parse_pollutants(r#"{"lead": 1}"#).is_err());
    }
}
