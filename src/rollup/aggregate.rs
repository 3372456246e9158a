use tracing::debug;

use crate::aqi::{Pollutant, PollutantReading, resolve};
use crate::config::AqiConfig;
use crate::error::{Error, Result};
use crate::rollup::types::{LocationRecord, ParentKey, ParentMetadata};
use crate::rollup::utility::{mean, plurality};

/// Rolls a group of child records up into one parent record.
///
/// Every child must sit at the level directly below `parent`, map onto
/// `parent.key` and share one timestamp; otherwise this fails with
/// [`Error::InvalidGrouping`] and produces nothing.
///
/// Concentrations are averaged per pollutant over the children that report
/// a finite value, and the index is re-resolved from those averages. Child
/// indices are never averaged. The category label is the plurality of the
/// children's labels.
pub fn aggregate(
    children: &[LocationRecord],
    parent: &ParentMetadata,
    config: &AqiConfig,
) -> Result<LocationRecord> {
    let first = children.first().ok_or_else(|| Error::InvalidGrouping {
        reason: format!("no children to aggregate into {}", parent.key),
    })?;

    let group_by = parent.key.group_by();
    for child in children {
        match group_by.key(child) {
            Some(key) if key == parent.key => {}
            Some(key) => {
                return Err(Error::InvalidGrouping {
                    reason: format!(
                        "{} {} belongs to {key}, not {}",
                        child.level,
                        child.name(),
                        parent.key
                    ),
                });
            }
            None => {
                return Err(Error::InvalidGrouping {
                    reason: format!(
                        "{} {} cannot roll up into a {}",
                        child.level,
                        child.name(),
                        parent.key.level()
                    ),
                });
            }
        }

        if child.timestamp != first.timestamp {
            return Err(Error::InvalidGrouping {
                reason: format!(
                    "mixed timestamps {} and {} for {}",
                    first.timestamp, child.timestamp, parent.key
                ),
            });
        }
    }

    let pollutants = average_pollutants(children);
    let aqi = resolve(&pollutants, config).ok_or_else(|| Error::InsufficientData {
        location: parent.key.to_string(),
    })?;

    let category = plurality(children.iter().map(|c| c.category.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| aqi.category(config.scheme).to_string());

    debug!(
        parent = %parent.key,
        children = children.len(),
        aqi = aqi.index,
        governing = %aqi.governing,
        "Aggregated group"
    );

    let (region, country) = match &parent.key {
        ParentKey::Region { region, country } => (Some(region.clone()), country.clone()),
        ParentKey::Country { country } => (None, country.clone()),
    };

    Ok(LocationRecord {
        level: parent.key.level(),
        city: None,
        region,
        country,
        timestamp: first.timestamp,
        coordinates: parent.coordinates,
        pollutants,
        aqi,
        category,
        is_country_metro: false,
        is_region_metro: false,
    })
}

/// Per-pollutant mean across children. Pollutants no child reports are left out.
fn average_pollutants(children: &[LocationRecord]) -> PollutantReading {
    Pollutant::ALL
        .iter()
        .filter_map(|&p| mean(children.iter().filter_map(|c| c.pollutants.get(p))).map(|avg| (p, avg)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::sub_index;
    use crate::rollup::types::{Coordinates, Level};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 6, 0, 0).unwrap()
    }

    fn city(name: &str, region: &str, pollutants: PollutantReading, category: &str) -> LocationRecord {
        let config = AqiConfig::default();
        LocationRecord {
            level: Level::City,
            city: Some(name.to_string()),
            region: Some(region.to_string()),
            country: "India".to_string(),
            timestamp: ts(),
            coordinates: Coordinates::new(10.0, 76.0),
            aqi: resolve(&pollutants, &config).unwrap(),
            pollutants,
            category: category.to_string(),
            is_country_metro: false,
            is_region_metro: true,
        }
    }

    fn region_parent(region: &str) -> ParentMetadata {
        ParentMetadata {
            key: ParentKey::Region {
                region: region.to_string(),
                country: "India".to_string(),
            },
            coordinates: Coordinates::new(10.5, 76.2),
        }
    }

    fn pm2_5(v: f64) -> PollutantReading {
        PollutantReading::new().with(Pollutant::Pm2_5, v)
    }

    #[test]
    fn test_averages_concentrations_not_indices() {
        let config = AqiConfig::default();
        let children = vec![
            city("A", "Kerala", pm2_5(20.0), "Good"),
            city("B", "Kerala", pm2_5(40.0), "Moderate"),
            city("C", "Kerala", pm2_5(60.0), "Moderate"),
        ];

        let record = aggregate(&children, &region_parent("Kerala"), &config).unwrap();

        assert_relative_eq!(record.pollutants.get(Pollutant::Pm2_5).unwrap(), 40.0);
        let direct = sub_index(40.0, Pollutant::Pm2_5, &config.breakpoints).unwrap();
        assert_eq!(record.aqi.index, direct);

        let child_mean =
            children.iter().map(|c| c.aqi.index as f64).sum::<f64>() / children.len() as f64;
        assert_ne!(record.aqi.index as f64, child_mean);
    }

    #[test]
    fn test_nonlinear_bands_diverge_from_index_mean() {
        let config = AqiConfig::default();
        let children = vec![
            city("A", "Kerala", pm2_5(20.0), "Good"),
            city("B", "Kerala", pm2_5(40.0), "Moderate"),
            city("C", "Kerala", pm2_5(90.0), "Unhealthy"),
        ];

        let record = aggregate(&children, &region_parent("Kerala"), &config).unwrap();

        // 33, 66 and 200 average to 99.7; the averaged 50 µg/m³ scores 83.
        assert_eq!(record.aqi.index, 83);
        let child_mean =
            children.iter().map(|c| c.aqi.index as f64).sum::<f64>() / children.len() as f64;
        assert_relative_eq!(child_mean, 299.0 / 3.0);
    }

    #[test]
    fn test_single_child_is_idempotent() {
        let config = AqiConfig::default();
        let reading = PollutantReading::new()
            .with(Pollutant::Pm10, 120.0)
            .with(Pollutant::No2, 33.3)
            .with(Pollutant::Co, 900.0);
        let child = city("A", "Kerala", reading.clone(), "Moderate");

        let record = aggregate(std::slice::from_ref(&child), &region_parent("Kerala"), &config).unwrap();

        for (p, v) in reading.iter() {
            assert_relative_eq!(record.pollutants.get(p).unwrap(), v);
        }
        assert_eq!(record.aqi, resolve(&reading, &config).unwrap());
        assert_eq!(record.category, "Moderate");
    }

    #[test]
    fn test_output_shape() {
        let config = AqiConfig::default();
        let children = vec![city("A", "Kerala", pm2_5(10.0), "Good")];
        let parent = region_parent("Kerala");

        let record = aggregate(&children, &parent, &config).unwrap();

        assert_eq!(record.level, Level::Region);
        assert_eq!(record.region.as_deref(), Some("Kerala"));
        assert_eq!(record.city, None);
        assert_eq!(record.country, "India");
        assert_eq!(record.coordinates, parent.coordinates);
        assert_eq!(record.timestamp, ts());
        assert!(!record.is_region_metro);
    }

    #[test]
    fn test_absent_pollutant_is_excluded_not_zero() {
        let config = AqiConfig::default();
        let children = vec![
            city("A", "Kerala", pm2_5(30.0).with(Pollutant::So2, 100.0), "Good"),
            city("B", "Kerala", pm2_5(50.0), "Good"),
        ];

        let record = aggregate(&children, &region_parent("Kerala"), &config).unwrap();

        assert_relative_eq!(record.pollutants.get(Pollutant::So2).unwrap(), 100.0);
        assert_eq!(record.pollutants.get(Pollutant::O3), None);
        assert_eq!(record.pollutants.len(), 2);
    }

    #[test]
    fn test_category_plurality() {
        let config = AqiConfig::default();
        let children = vec![
            city("A", "Kerala", pm2_5(10.0), "Satisfactory"),
            city("B", "Kerala", pm2_5(10.0), "Good"),
            city("C", "Kerala", pm2_5(10.0), "Good"),
        ];

        let record = aggregate(&children, &region_parent("Kerala"), &config).unwrap();
        assert_eq!(record.category, "Good");
    }

    #[test]
    fn test_mixed_regions_is_invalid_grouping() {
        let config = AqiConfig::default();
        let children = vec![
            city("A", "Kerala", pm2_5(10.0), "Good"),
            city("B", "Goa", pm2_5(10.0), "Good"),
        ];

        let err = aggregate(&children, &region_parent("Kerala"), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }

    #[test]
    fn test_mixed_timestamps_is_invalid_grouping() {
        let config = AqiConfig::default();
        let mut late = city("B", "Kerala", pm2_5(10.0), "Good");
        late.timestamp = ts() + chrono::Duration::hours(1);
        let children = vec![city("A", "Kerala", pm2_5(10.0), "Good"), late];

        let err = aggregate(&children, &region_parent("Kerala"), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }

    #[test]
    fn test_wrong_level_is_invalid_grouping() {
        let config = AqiConfig::default();
        let children = vec![city("A", "Kerala", pm2_5(10.0), "Good")];
        let parent = ParentMetadata {
            key: ParentKey::Country {
                country: "India".to_string(),
            },
            coordinates: Coordinates::default(),
        };

        let err = aggregate(&children, &parent, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }

    #[test]
    fn test_empty_children_is_invalid_grouping() {
        let err = aggregate(&[], &region_parent("Kerala"), &AqiConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }
}
