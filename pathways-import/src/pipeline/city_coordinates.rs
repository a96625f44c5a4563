//! City coordinate table
//!
//! Fallback coordinates for Locations that have none, keyed by the city of
//! the physical address. The table is a header-less `city,longitude,latitude`
//! CSV. Lookups ignore case and surrounding space.

use crate::error::{ImportError, Result};
use crate::models::Location;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Longitude and latitude of one city
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Immutable city → point table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityCoordinates {
    points: HashMap<String, CityPoint>,
}

fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}

impl CityCoordinates {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ImportError::MissingFile(path.to_path_buf()));
        }
        let table = Self::from_reader(std::fs::File::open(path)?)?;
        info!(path = %path.display(), cities = table.len(), "Loaded city coordinates");
        Ok(table)
    }

    /// Rows that do not hold a city and two numbers are skipped with a warning
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = HashMap::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            match parse_row(&row) {
                Some((city, point)) => {
                    points.insert(city_key(&city), point);
                }
                None => warn!(line = index + 1, "Skipping unusable city coordinate row"),
            }
        }
        Ok(Self { points })
    }

    pub fn insert(&mut self, city: &str, point: CityPoint) {
        self.points.insert(city_key(city), point);
    }

    pub fn lookup(&self, city: &str) -> Option<CityPoint> {
        self.points.get(&city_key(city)).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fill missing coordinates of an already-identified Location
    ///
    /// Returns true when coordinates were applied. The Location id is not
    /// touched.
    pub fn fill(&self, location: &mut Location, city: Option<&str>) -> bool {
        if location.latitude.is_some() || location.longitude.is_some() {
            return false;
        }
        let Some(city) = city else {
            return false;
        };

        match self.lookup(city) {
            Some(point) => {
                location.latitude = Some(point.latitude);
                location.longitude = Some(point.longitude);
                debug!(location_id = %location.id, city, "Applied city coordinates");
                true
            }
            None => {
                warn!(location_id = %location.id, city, "City has no coordinates in the table");
                false
            }
        }
    }
}

fn parse_row(row: &StringRecord) -> Option<(String, CityPoint)> {
    let city = row.get(0).filter(|c| !c.is_empty())?;
    let longitude = row.get(1)?.parse::<f64>().ok()?;
    let latitude = row.get(2)?.parse::<f64>().ok()?;
    Some((
        city.to_string(),
        CityPoint {
            longitude,
            latitude,
        },
    ))
}
