//! Geographic positions.

use serde::Serialize;

use super::DomainError;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLong {
    lat: f64,
    lon: f64,
}

impl LatLong {
    pub fn new(lat: f64, lon: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::InvalidPosition("latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::InvalidPosition("longitude out of range"));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &LatLong) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Coarse grid cell, roughly 100m square at UK latitudes.
    ///
    /// Used for cheap proximity ordering, not distance.
    pub fn grid(&self) -> (i64, i64) {
        ((self.lat * 1000.0).round() as i64, (self.lon * 600.0).round() as i64)
    }
}
