use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::aqi::resolve;
use crate::config::AqiConfig;
use crate::error::{Error, Result};
use crate::metadata::HierarchyMetadata;
use crate::rollup::aggregate::aggregate;
use crate::rollup::types::{
    CycleReport, GroupBy, Level, LocationRecord, ParentKey, RawReading, RollupResult, StageReport,
};

/// Runs one ingestion cycle: readings → cities → regions → countries.
///
/// Every reading must carry the same capture timestamp; use [`run_cycles`]
/// for a batch spanning several. Readings without city metadata or without
/// any scorable pollutant are dropped and counted. Regions or countries
/// without metadata are dropped the same way. If no city survives, the
/// cycle fails with [`Error::EmptyCycle`].
#[tracing::instrument(skip_all, fields(readings = raw.len()))]
pub fn run_rollup(
    raw: &[RawReading],
    metadata: &HierarchyMetadata,
    config: &AqiConfig,
) -> Result<RollupResult> {
    let timestamp = cycle_timestamp(raw)?;

    let mut city_report = StageReport::default();
    let outcomes: Vec<Result<LocationRecord>> = raw
        .par_iter()
        .map(|reading| city_record(reading, metadata, config))
        .collect();

    let mut cities = Vec::with_capacity(outcomes.len());
    for (reading, outcome) in raw.iter().zip(outcomes) {
        match outcome {
            Ok(record) => {
                city_report.record_success();
                cities.push(record);
            }
            Err(e) => {
                warn!(location = %reading.location_id, error = %e, "Dropping reading");
                city_report.record_failure(&reading.location_id);
            }
        }
    }

    if cities.is_empty() {
        return Err(Error::EmptyCycle {
            attempted: city_report.attempted,
            failed_ids: city_report.failed_ids,
        });
    }

    let mut region_report = StageReport::default();
    let regions = roll_up(&cities, GroupBy::Region, metadata, config, &mut region_report)?;

    let mut country_report = StageReport::default();
    let countries = roll_up(&regions, GroupBy::Country, metadata, config, &mut country_report)?;
    record_countries_without_regions(&cities, &regions, &mut country_report);

    info!(
        timestamp = %timestamp,
        cities = cities.len(),
        regions = regions.len(),
        countries = countries.len(),
        failed = city_report.failed,
        "Cycle complete"
    );

    Ok(RollupResult {
        cities,
        regions,
        countries,
        report: CycleReport {
            timestamp,
            cities: city_report,
            regions: region_report,
            countries: country_report,
        },
    })
}

/// Splits a batch by capture timestamp and runs one cycle per timestamp,
/// oldest first. A failed cycle does not stop the ones after it.
pub fn run_cycles(
    raw: &[RawReading],
    metadata: &HierarchyMetadata,
    config: &AqiConfig,
) -> Vec<(DateTime<Utc>, Result<RollupResult>)> {
    let mut batches: BTreeMap<DateTime<Utc>, Vec<RawReading>> = BTreeMap::new();
    for reading in raw {
        batches
            .entry(reading.captured_at)
            .or_default()
            .push(reading.clone());
    }

    info!(cycles = batches.len(), readings = raw.len(), "Running rollup cycles");

    batches
        .into_iter()
        .map(|(timestamp, readings)| {
            let outcome = run_rollup(&readings, metadata, config);
            if let Err(e) = &outcome {
                warn!(timestamp = %timestamp, error = %e, "Cycle failed");
            }
            (timestamp, outcome)
        })
        .collect()
}

fn cycle_timestamp(raw: &[RawReading]) -> Result<DateTime<Utc>> {
    let first = raw.first().ok_or(Error::EmptyCycle {
        attempted: 0,
        failed_ids: Vec::new(),
    })?;

    if let Some(other) = raw.iter().find(|r| r.captured_at != first.captured_at) {
        return Err(Error::InvalidGrouping {
            reason: format!(
                "cycle mixes timestamps {} and {}",
                first.captured_at, other.captured_at
            ),
        });
    }

    Ok(first.captured_at)
}

/// Builds the city record for one raw reading.
fn city_record(
    reading: &RawReading,
    metadata: &HierarchyMetadata,
    config: &AqiConfig,
) -> Result<LocationRecord> {
    let meta = metadata
        .city(&reading.location_id)
        .ok_or_else(|| Error::MetadataMissing {
            level: Level::City,
            key: reading.location_id.clone(),
        })?;

    let aqi = resolve(&reading.pollutants, config).ok_or_else(|| Error::InsufficientData {
        location: reading.location_id.clone(),
    })?;

    let category = reading
        .category
        .clone()
        .unwrap_or_else(|| aqi.category(config.scheme).to_string());

    Ok(LocationRecord {
        level: Level::City,
        city: Some(meta.city.clone()),
        region: Some(meta.region.clone()),
        country: meta.country.clone(),
        timestamp: reading.captured_at,
        coordinates: meta.coordinates,
        pollutants: reading.pollutants.clone(),
        aqi,
        category,
        is_country_metro: meta.is_country_metro,
        is_region_metro: meta.is_region_metro,
    })
}

/// Groups `children` with `group_by` and aggregates each group in parallel.
/// Output is ordered by parent key.
fn roll_up(
    children: &[LocationRecord],
    group_by: GroupBy,
    metadata: &HierarchyMetadata,
    config: &AqiConfig,
    report: &mut StageReport,
) -> Result<Vec<LocationRecord>> {
    let mut groups: BTreeMap<ParentKey, Vec<LocationRecord>> = BTreeMap::new();
    for child in children {
        match group_by.key(child) {
            Some(key) => groups.entry(key).or_default().push(child.clone()),
            None => {
                warn!(
                    child_level = %child.level,
                    location = child.name(),
                    "Record has no {} to roll up into",
                    group_by.parent_level()
                );
                report.record_failure(child.name());
            }
        }
    }

    let groups: Vec<(ParentKey, Vec<LocationRecord>)> = groups.into_iter().collect();
    let outcomes: Vec<Result<LocationRecord>> = groups
        .par_iter()
        .map(|(key, members)| aggregate_group(key, members, metadata, config))
        .collect();

    let mut records = Vec::with_capacity(outcomes.len());
    for ((key, _), outcome) in groups.iter().zip(outcomes) {
        match outcome {
            Ok(record) => {
                report.record_success();
                records.push(record);
            }
            Err(e @ Error::InvalidGrouping { .. }) => return Err(e),
            Err(e) => {
                warn!(parent = %key, error = %e, "Dropping {}", group_by.parent_level());
                report.record_failure(&key.to_string());
            }
        }
    }

    Ok(records)
}

/// Counts a country as failed when it has cities but none of its regions
/// survived, since the country stage never sees it.
fn record_countries_without_regions(
    cities: &[LocationRecord],
    regions: &[LocationRecord],
    report: &mut StageReport,
) {
    let covered: BTreeSet<&str> = regions.iter().map(|r| r.country.as_str()).collect();
    let missing: BTreeSet<&str> = cities
        .iter()
        .map(|c| c.country.as_str())
        .filter(|country| !covered.contains(country))
        .collect();

    for country in missing {
        warn!(country = %country, "No region survived, dropping country");
        report.record_failure(country);
    }
}

fn aggregate_group(
    key: &ParentKey,
    members: &[LocationRecord],
    metadata: &HierarchyMetadata,
    config: &AqiConfig,
) -> Result<LocationRecord> {
    let parent = metadata.parent(key).ok_or_else(|| Error::MetadataMissing {
        level: key.level(),
        key: key.to_string(),
    })?;
    aggregate(members, &parent, config)
}
