//! Emitter module - identities, records and the spatial filter
//!
//! - Band-aware emitter identification with unique and storage keys
//! - Emitter records with an asymmetric coverage ellipse
//! - Closed latitude/longitude bounding boxes

mod identity;
mod record;

pub use identity::{identify, EmitterType, RfIdentification};
pub use record::EmitterRecord;

use serde::{Deserialize, Serialize};

/// Metres per degree of latitude (spherical approximation)
const METERS_PER_DEGREE: f64 = 111_225.0;

/// Axis-aligned latitude/longitude rectangle in degrees
///
/// Closed on every edge. No antimeridian wraparound: callers that need a box
/// crossing ±180° must split it themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Box from its four edges in degrees
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Box around a centre point that covers `radius_m` metres in every direction
    pub fn around(latitude: f64, longitude: f64, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE;
        let cos_lat = latitude.to_radians().cos().abs().max(1e-6);
        let lon_delta = radius_m / (METERS_PER_DEGREE * cos_lat);

        Self {
            north: (latitude + lat_delta).min(90.0),
            south: (latitude - lat_delta).max(-90.0),
            east: longitude + lon_delta,
            west: longitude - lon_delta,
        }
    }

    /// Same rule the store applies in SQL: `south <= lat <= north AND west <= lon <= east`
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.south <= latitude
            && latitude <= self.north
            && self.west <= longitude
            && longitude <= self.east
    }
}
