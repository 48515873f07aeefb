//! Shared geographic and time primitives.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds, the timestamp unit used across the workspace.
pub type TimestampMs = u64;

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Create a new geographic point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Straight-line distance in degree space (simple planar check).
    pub fn euclidean_degrees(&self, other: &GeoPoint) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Great-circle distance in kilometers using the haversine formula.
    pub fn haversine_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// Distance metric used for agent-to-target matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Planar distance over raw lat/lon degrees
    EuclideanDegrees,
    /// Great-circle distance in kilometers
    HaversineKm,
}

impl DistanceMetric {
    /// Measure the distance between two points under this metric.
    pub fn measure(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        match self {
            DistanceMetric::EuclideanDegrees => a.euclidean_degrees(b),
            DistanceMetric::HaversineKm => a.haversine_km(b),
        }
    }
}
