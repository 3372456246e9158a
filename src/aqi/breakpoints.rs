//! Concentration → sub-index breakpoint tables.
//!
//! A table is plain data. The default is the published CPCB table, whose
//! rows leave small gaps between one band's upper edge and the next band's
//! lower edge (30 → 31 for pm2_5). Lookup assigns a value inside a gap to
//! the band above it, so every concentration from zero to the ceiling is
//! matched. Tables can be replaced per pollutant from a JSON file of the
//! same shape as the default:
//!
//! ```json
//! { "pm2_5": [[0, 30, 0, 50], [31, 60, 51, 100]] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::aqi::types::Pollutant;
use crate::error::{Error, Result};

/// Highest value an index band may reach.
pub const MAX_INDEX: f64 = 500.0;

/// One linear segment `[lo, hi] → [index_lo, index_hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
    pub index_lo: f64,
    pub index_hi: f64,
}

impl Band {
    pub const fn new(lo: f64, hi: f64, index_lo: f64, index_hi: f64) -> Self {
        Self {
            lo,
            hi,
            index_lo,
            index_hi,
        }
    }

}

impl From<[f64; 4]> for Band {
    fn from([lo, hi, index_lo, index_hi]: [f64; 4]) -> Self {
        Band::new(lo, hi, index_lo, index_hi)
    }
}

impl From<Band> for [f64; 4] {
    fn from(b: Band) -> Self {
        [b.lo, b.hi, b.index_lo, b.index_hi]
    }
}

/// CPCB rows `[Blo, Bhi, Ilo, Ihi]` per pollutant. The last row's upper
/// edge is the hard ceiling. CO is in mg/m³, everything else in µg/m³.
static CPCB_ROWS: &[(Pollutant, [[f64; 4]; 6])] = &[
    (
        Pollutant::Co,
        [
            [0.0, 1.0, 0.0, 50.0],
            [1.1, 2.0, 51.0, 100.0],
            [2.1, 10.0, 101.0, 200.0],
            [10.1, 17.0, 201.0, 300.0],
            [17.1, 34.0, 301.0, 400.0],
            [34.1, 1000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::No2,
        [
            [0.0, 40.0, 0.0, 50.0],
            [41.0, 80.0, 51.0, 100.0],
            [81.0, 180.0, 101.0, 200.0],
            [181.0, 280.0, 201.0, 300.0],
            [281.0, 400.0, 301.0, 400.0],
            [401.0, 10000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::O3,
        [
            [0.0, 50.0, 0.0, 50.0],
            [51.0, 100.0, 51.0, 100.0],
            [101.0, 168.0, 101.0, 200.0],
            [169.0, 208.0, 201.0, 300.0],
            [209.0, 748.0, 301.0, 400.0],
            [749.0, 100000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::So2,
        [
            [0.0, 40.0, 0.0, 50.0],
            [41.0, 80.0, 51.0, 100.0],
            [81.0, 380.0, 101.0, 200.0],
            [381.0, 800.0, 201.0, 300.0],
            [801.0, 1600.0, 301.0, 400.0],
            [1601.0, 100000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::Pm2_5,
        [
            [0.0, 30.0, 0.0, 50.0],
            [31.0, 60.0, 51.0, 100.0],
            [61.0, 90.0, 101.0, 200.0],
            [91.0, 120.0, 201.0, 300.0],
            [121.0, 250.0, 301.0, 400.0],
            [251.0, 10000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::Pm10,
        [
            [0.0, 50.0, 0.0, 50.0],
            [51.0, 100.0, 51.0, 100.0],
            [101.0, 250.0, 101.0, 200.0],
            [251.0, 350.0, 201.0, 300.0],
            [351.0, 430.0, 301.0, 400.0],
            [431.0, 10000.0, 401.0, 500.0],
        ],
    ),
    (
        Pollutant::Nh3,
        [
            [0.0, 200.0, 0.0, 50.0],
            [201.0, 400.0, 51.0, 100.0],
            [401.0, 800.0, 101.0, 200.0],
            [801.0, 1200.0, 201.0, 300.0],
            [1201.0, 1800.0, 301.0, 400.0],
            [1801.0, 100000.0, 401.0, 500.0],
        ],
    ),
];

/// Breakpoint bands for every scored pollutant.
///
/// Pollutants without an entry (such as `no`) are never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointTable {
    tables: BTreeMap<Pollutant, Vec<Band>>,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::cpcb()
    }
}

impl BreakpointTable {
    /// The built-in CPCB table.
    pub fn cpcb() -> Self {
        let tables = CPCB_ROWS
            .iter()
            .map(|(pollutant, rows)| (*pollutant, rows.iter().copied().map(Band::from).collect()))
            .collect();
        Self { tables }
    }

    /// Builds a table from explicit bands, validating each pollutant.
    pub fn from_bands(tables: BTreeMap<Pollutant, Vec<Band>>) -> Result<Self> {
        let table = Self { tables };
        table.validate()?;
        Ok(table)
    }

    /// Reads a JSON override file and lays it over this table. Pollutants
    /// present in the file replace the existing bands wholesale.
    pub fn with_overrides_from(mut self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let overrides: BTreeMap<Pollutant, Vec<Band>> = serde_json::from_str(&content)?;
        self.tables.extend(overrides);
        self.validate()?;
        Ok(self)
    }

    pub fn bands(&self, pollutant: Pollutant) -> Option<&[Band]> {
        self.tables.get(&pollutant).map(Vec::as_slice)
    }

    pub fn pollutants(&self) -> impl Iterator<Item = Pollutant> + '_ {
        self.tables.keys().copied()
    }

    /// Checks that every table starts at zero, is ascending without overlaps
    /// and maps onto non-decreasing index values within `[0, 500]`. Gaps
    /// between bands are allowed.
    pub fn validate(&self) -> Result<()> {
        for (pollutant, bands) in &self.tables {
            validate_bands(*pollutant, bands)?;
        }
        Ok(())
    }
}

fn validate_bands(pollutant: Pollutant, bands: &[Band]) -> Result<()> {
    let invalid = |reason: String| Error::InvalidBreakpoints { pollutant, reason };

    let first = bands
        .first()
        .ok_or_else(|| invalid("table is empty".to_string()))?;
    if first.lo != 0.0 {
        return Err(invalid(format!("first band starts at {}, not 0", first.lo)));
    }

    for (i, band) in bands.iter().enumerate() {
        if !(band.lo.is_finite() && band.hi.is_finite()) || band.hi <= band.lo {
            return Err(invalid(format!("band {i} has bounds [{}, {}]", band.lo, band.hi)));
        }
        if band.index_lo < 0.0 || band.index_hi > MAX_INDEX || band.index_hi < band.index_lo {
            return Err(invalid(format!(
                "band {i} has index range [{}, {}]",
                band.index_lo, band.index_hi
            )));
        }
    }

    for (i, pair) in bands.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if b.lo < a.hi {
            return Err(invalid(format!(
                "band {i} (ends {}) overlaps band {} (starts {})",
                a.hi,
                i + 1,
                b.lo
            )));
        }
        if b.index_lo < a.index_hi {
            return Err(invalid(format!(
                "index decreases between band {i} and band {}",
                i + 1
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpcb_table_is_valid() {
        let table = BreakpointTable::cpcb();
        table.validate().unwrap();
        assert!(table.bands(Pollutant::No).is_none());
        assert_eq!(table.bands(Pollutant::Pm2_5).unwrap().len(), 6);
        assert_eq!(table.pollutants().count(), 7);
    }

    #[test]
    fn test_cpcb_pm2_5_bands() {
        let table = BreakpointTable::cpcb();
        let bands = table.bands(Pollutant::Pm2_5).unwrap();
        assert_eq!(bands[1], Band::new(31.0, 60.0, 51.0, 100.0));
        assert_eq!(bands[5].hi, 10000.0);
        assert_eq!(bands[5].index_hi, 500.0);
    }

    #[test]
    fn test_cpcb_rows_match_published_table() {
        let table = BreakpointTable::cpcb();
        let lower_edges: Vec<(f64, f64)> = table
            .bands(Pollutant::So2)
            .unwrap()
            .iter()
            .map(|b| (b.lo, b.index_lo))
            .collect();
        assert_eq!(
            lower_edges,
            vec![(0.0, 0.0), (41.0, 51.0), (81.0, 101.0), (381.0, 201.0), (801.0, 301.0), (1601.0, 401.0)]
        );

        let co = table.bands(Pollutant::Co).unwrap();
        assert_eq!(co[1], Band::new(1.1, 2.0, 51.0, 100.0));
        assert_eq!(co[5], Band::new(34.1, 1000.0, 401.0, 500.0));
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(
            Pollutant::Pm10,
            vec![Band::new(0.0, 50.0, 0.0, 50.0), Band::new(45.0, 100.0, 51.0, 100.0)],
        );
        let err = BreakpointTable::from_bands(tables).unwrap_err();
        assert!(matches!(err, Error::InvalidBreakpoints { pollutant: Pollutant::Pm10, .. }));
    }

    #[test]
    fn test_gap_is_accepted() {
        let mut tables = BTreeMap::new();
        tables.insert(
            Pollutant::Pm10,
            vec![Band::new(0.0, 50.0, 0.0, 50.0), Band::new(51.0, 100.0, 51.0, 100.0)],
        );
        assert!(BreakpointTable::from_bands(tables).is_ok());
    }

    #[test]
    fn test_decreasing_index_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(
            Pollutant::Pm10,
            vec![Band::new(0.0, 50.0, 0.0, 50.0), Band::new(51.0, 100.0, 40.0, 100.0)],
        );
        assert!(BreakpointTable::from_bands(tables).is_err());
    }

    #[test]
    fn test_nonzero_start_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(Pollutant::O3, vec![Band::new(1.0, 50.0, 0.0, 50.0)]);
        assert!(BreakpointTable::from_bands(tables).is_err());
    }

    #[test]
    fn test_index_above_max_is_rejected() {
        let mut tables = BTreeMap::new();
        tables.insert(Pollutant::O3, vec![Band::new(0.0, 50.0, 0.0, 600.0)]);
        assert!(BreakpointTable::from_bands(tables).is_err());
    }

    #[test]
    fn test_overrides_replace_single_pollutant() {
        let path = std::env::temp_dir().join("aqi_rollup_test_breakpoints.json");
        std::fs::write(&path, r#"{"pm25": [[0, 100, 0, 100], [100, 1000, 100, 500]]}"#).unwrap();

        let table = BreakpointTable::cpcb().with_overrides_from(&path).unwrap();
        assert_eq!(table.bands(Pollutant::Pm2_5).unwrap().len(), 2);
        assert_eq!(table.bands(Pollutant::Pm10).unwrap().len(), 6);

        std::fs::remove_file(&path).unwrap();
    }
}
