//! Static hierarchy reference data: which region and country each city
//! belongs to, and the representative coordinates of every level.
//!
//! Loaded from three CSV files:
//!
//! | File            | Columns                                                                                   |
//! |-----------------|-------------------------------------------------------------------------------------------|
//! | `cities.csv`    | `city,state,country,latitude,longitude,is_country_metro_city,is_state_metro_city`         |
//! | `states.csv`    | `state,country,latitude,longitude`                                                        |
//! | `countries.csv` | `country,latitude,longitude`                                                              |

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::rollup::{Coordinates, ParentKey, ParentMetadata};

/// Reference data for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityMeta {
    pub city: String,
    pub region: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub is_country_metro: bool,
    pub is_region_metro: bool,
}

#[derive(Debug, Deserialize)]
struct CityRow {
    city: String,
    state: String,
    country: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    is_country_metro_city: bool,
    #[serde(default)]
    is_state_metro_city: bool,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    state: String,
    country: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    country: String,
    latitude: f64,
    longitude: f64,
}

/// City → region → country mapping plus representative points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyMetadata {
    cities: HashMap<String, CityMeta>,
    parents: HashMap<ParentKey, Coordinates>,
}

impl HierarchyMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `cities.csv`, `states.csv` and `countries.csv` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let metadata = Self::from_readers(
            std::fs::File::open(dir.join("cities.csv"))?,
            std::fs::File::open(dir.join("states.csv"))?,
            std::fs::File::open(dir.join("countries.csv"))?,
        )?;

        info!(
            dir = %dir.display(),
            cities = metadata.cities.len(),
            parents = metadata.parents.len(),
            "Hierarchy metadata loaded"
        );
        Ok(metadata)
    }

    pub fn from_readers<C: Read, S: Read, N: Read>(cities: C, states: S, countries: N) -> Result<Self> {
        let mut metadata = Self::new();

        for row in csv::Reader::from_reader(cities).deserialize() {
            let row: CityRow = row?;
            metadata.add_city(CityMeta {
                city: row.city,
                region: row.state,
                country: row.country,
                coordinates: Coordinates::new(row.latitude, row.longitude),
                is_country_metro: row.is_country_metro_city,
                is_region_metro: row.is_state_metro_city,
            });
        }

        for row in csv::Reader::from_reader(states).deserialize() {
            let row: RegionRow = row?;
            metadata.add_region(&row.state, &row.country, Coordinates::new(row.latitude, row.longitude));
        }

        for row in csv::Reader::from_reader(countries).deserialize() {
            let row: CountryRow = row?;
            metadata.add_country(&row.country, Coordinates::new(row.latitude, row.longitude));
        }

        Ok(metadata)
    }

    pub fn add_city(&mut self, city: CityMeta) {
        if self.cities.contains_key(&city.city) {
            debug!(city = %city.city, "Duplicate city metadata, keeping the last row");
        }
        self.cities.insert(city.city.clone(), city);
    }

    pub fn add_region(&mut self, region: &str, country: &str, coordinates: Coordinates) {
        let key = ParentKey::Region {
            region: region.to_string(),
            country: country.to_string(),
        };
        self.parents.insert(key, coordinates);
    }

    pub fn add_country(&mut self, country: &str, coordinates: Coordinates) {
        let key = ParentKey::Country {
            country: country.to_string(),
        };
        self.parents.insert(key, coordinates);
    }

    pub fn city(&self, name: &str) -> Option<&CityMeta> {
        self.cities.get(name)
    }

    /// Metadata the aggregator needs for `key`, if the parent is known.
    pub fn parent(&self, key: &ParentKey) -> Option<ParentMetadata> {
        self.parents.get(key).map(|coordinates| ParentMetadata {
            key: key.clone(),
            coordinates: *coordinates,
        })
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITIES: &str = "\
city,state,country,latitude,longitude,is_country_metro_city,is_state_metro_city
Kochi,Kerala,India,9.93,76.26,false,true
Mumbai,Maharashtra,India,19.07,72.87,true,true
Pune,Maharashtra,India,18.52,73.85,false,false
";
    const STATES: &str = "\
state,country,latitude,longitude
Kerala,India,10.85,76.27
Maharashtra,India,19.75,75.71
";
    const COUNTRIES: &str = "\
country,latitude,longitude
India,20.59,78.96
";

    #[test]
    fn test_from_readers() {
        let metadata =
            HierarchyMetadata::from_readers(CITIES.as_bytes(), STATES.as_bytes(), COUNTRIES.as_bytes())
                .unwrap();

        assert_eq!(metadata.city_count(), 3);
        let mumbai = metadata.city("Mumbai").unwrap();
        assert_eq!(mumbai.region, "Maharashtra");
        assert!(mumbai.is_country_metro);
        assert!(mumbai.is_region_metro);
        assert!(!metadata.city("Pune").unwrap().is_region_metro);

        let kerala = metadata
            .parent(&ParentKey::Region {
                region: "Kerala".into(),
                country: "India".into(),
            })
            .unwrap();
        assert_eq!(kerala.coordinates, Coordinates::new(10.85, 76.27));

        assert!(metadata
            .parent(&ParentKey::Country {
                country: "India".into()
            })
            .is_some());
        assert!(metadata
            .parent(&ParentKey::Country {
                country: "Nepal".into()
            })
            .is_none());
    }

    #[test]
    fn test_bad_row_is_an_error() {
        let cities = "city,state,country,latitude,longitude\nKochi,Kerala,India,north,76.26\n";
        let result =
            HierarchyMetadata::from_readers(cities.as_bytes(), STATES.as_bytes(), COUNTRIES.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_dir_missing_file() {
        let dir = std::env::temp_dir().join("aqi_rollup_no_such_metadata_dir");
        assert!(HierarchyMetadata::load_dir(&dir).is_err());
    }
}
