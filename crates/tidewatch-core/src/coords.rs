//! Geographic coordinate types shared by the grid, the featurizer and the
//! location lookups. All coordinate math uses f64.

use serde::{Deserialize, Serialize};

use crate::error::{CoastError, Result};

/// A point in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Validated constructor for externally supplied coordinates.
    pub fn checked(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoastError::Validation(format!(
                "coordinates must be finite, got lat={lat} lng={lon}"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoastError::Validation(format!("latitude {lat} outside [-90, 90]")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoastError::Validation(format!("longitude {lon} outside [-180, 180]")));
        }
        Ok(Self { lat, lon })
    }

    /// Planar distance in degrees. Good enough for nearest-neighbour lookups
    /// over a few hundred kilometres of coastline.
    pub fn degree_distance(&self, other: LatLon) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lon - other.lon).powi(2)).sqrt()
    }
}

/// Axis-aligned lat/lon rectangle, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self { min_lat, max_lat, min_lon, max_lon }
    }

    /// Square box of side `2 × half` centred on `center`.
    pub fn around(center: LatLon, half: f64) -> Self {
        Self::new(center.lat - half, center.lat + half, center.lon - half, center.lon + half)
    }

    pub fn contains(&self, p: LatLon) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lon >= self.min_lon && p.lon <= self.max_lon
    }

    pub fn center(&self) -> LatLon {
        LatLon::new((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }
}
