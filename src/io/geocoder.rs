use crate::core::geodesy::haversine_distance;
use crate::types::{FlightError, FlightResult};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Populated place returned by reverse geocoding
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    /// City or town
    pub name: String,
    /// First-level administrative region
    #[serde(default)]
    pub admin1: String,
    /// Country code
    #[serde(default)]
    pub cc: String,
}

impl Place {
    /// "city, region, country", skipping empty parts
    pub fn label(&self) -> String {
        [self.name.as_str(), self.admin1.as_str(), self.cc.as_str()]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Reverse geocoding oracle
pub trait Geocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> FlightResult<Option<Place>>;
}

/// Geocoder that never knows a place
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn reverse(&self, _latitude: f64, _longitude: f64) -> FlightResult<Option<Place>> {
        Ok(None)
    }
}

/// Offline nearest-place lookup over a table of populated places.
///
/// The CSV layout follows the GeoNames-derived `rg_cities1000.csv` tables:
/// a header row with at least `lat,lon,name,admin1,cc`.
#[derive(Debug, Clone, Default)]
pub struct PlaceTable {
    places: Vec<Place>,
}

impl PlaceTable {
    pub fn from_places(places: Vec<Place>) -> Self {
        Self { places }
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> FlightResult<Self> {
        log::info!("Loading place table: {}", path.as_ref().display());
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> FlightResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut places = Vec::new();
        for row in csv_reader.deserialize::<Place>() {
            places.push(row?);
        }
        log::debug!("{} places loaded", places.len());
        Ok(Self { places })
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for PlaceTable {
    fn reverse(&self, latitude: f64, longitude: f64) -> FlightResult<Option<Place>> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(FlightError::Geocoding(format!(
                "invalid coordinates ({}, {})",
                latitude, longitude
            )));
        }
        let nearest = self
            .places
            .iter()
            .map(|p| (haversine_distance(latitude, longitude, p.lat, p.lon), p))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| p.clone());
        Ok(nearest)
    }
}
