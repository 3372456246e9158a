//! Most-polluted rankings and notable-city selection over one cycle's records.

use serde::Serialize;

use crate::aqi::ScaleScheme;
use crate::rollup::{Level, LocationRecord};

/// Converts an index into a "puff score" using a per-scale factor.
///
/// | Scale | Factor |
/// |-------|--------|
/// | 1     | 0.02   |
/// | 2     | 0.06   |
/// | 3     | 0.08   |
/// | 4     | 0.12   |
/// | 5     | 0.15   |
/// | 6     | 0.20   |
pub fn puff_score(index: u16, scale: u8) -> u32 {
    let factor = match scale {
        1 => 0.02,
        2 => 0.06,
        3 => 0.08,
        4 => 0.12,
        5 => 0.15,
        6 => 0.20,
        _ => return 0,
    };
    (index as f64 * factor).round() as u32
}

/// Which records a ranking covers.
#[derive(Debug, Clone, Default)]
pub struct RankFilter {
    pub level: Option<Level>,
    pub country: Option<String>,
    pub region: Option<String>,
    /// 1-based page.
    pub page: usize,
    pub limit: usize,
}

impl RankFilter {
    pub fn cities() -> Self {
        Self {
            level: Some(Level::City),
            page: 1,
            limit: 50,
            ..Default::default()
        }
    }

    pub fn in_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn in_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    fn matches(&self, record: &LocationRecord) -> bool {
        let eq = |want: &Option<String>, have: Option<&str>| match want {
            Some(w) => have.is_some_and(|h| h.eq_ignore_ascii_case(w)),
            None => true,
        };
        self.level.is_none_or(|l| l == record.level)
            && eq(&self.country, Some(record.country.as_str()))
            && eq(&self.region, record.region.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub region: Option<String>,
    pub country: String,
    pub aqi: u16,
    pub scale: u8,
    pub status: &'static str,
    pub puff_score: u32,
}

/// Ranks matching records by index, highest first. Equal indices keep
/// their input order. Ranks are absolute across pages.
pub fn rank(records: &[LocationRecord], filter: &RankFilter, scheme: ScaleScheme) -> Vec<LeaderboardEntry> {
    let mut matching: Vec<&LocationRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    matching.sort_by(|a, b| b.aqi.index.cmp(&a.aqi.index));

    let limit = if filter.limit == 0 { matching.len() } else { filter.limit };
    let skip = filter.page.saturating_sub(1).saturating_mul(limit);

    matching
        .into_iter()
        .enumerate()
        .skip(skip)
        .take(limit)
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            name: r.name().to_string(),
            region: r.region.clone(),
            country: r.country.clone(),
            aqi: r.aqi.index,
            scale: r.aqi.scale,
            status: scheme.label(r.aqi.scale),
            puff_score: puff_score(r.aqi.index, r.aqi.scale),
        })
        .collect()
}

/// Whether notability is judged within the country or within a region.
#[derive(Debug, Clone)]
pub enum MetroScope {
    Country(String),
    Region { region: String, country: String },
}

/// City records flagged as metro points within `scope`.
pub fn metro_cities<'a>(records: &'a [LocationRecord], scope: &MetroScope) -> Vec<&'a LocationRecord> {
    records
        .iter()
        .filter(|r| r.level == Level::City)
        .filter(|r| match scope {
            MetroScope::Country(country) => r.is_country_metro && &r.country == country,
            MetroScope::Region { region, country } => {
                r.is_region_metro && &r.country == country && r.region.as_ref() == Some(region)
            }
        })
        .collect()
}
