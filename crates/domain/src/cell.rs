//! Atmospheric cell readings
//!
//! Maps raw per-cycle ingestion payloads to gridded cells with stable
//! grid keys. Cells are immutable once ingested for a given timestamp and
//! are superseded wholesale by the next ingestion cycle.

use aethernet_core::types::{GeoPoint, TimestampMs};
use serde::{Deserialize, Serialize};

/// Raw cell reading as it arrives in the per-cycle ingestion payload.
///
/// The payload is a JSON array of these objects. Only the five core fields
/// are required; the remaining fields enrich scoring and geometry advice
/// when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellReading {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Convective available potential energy (J/kg)
    pub cape: f64,
    /// Local rotational tendency of the wind field (1/s)
    pub vorticity: f64,
    /// Relative humidity fraction (0.0 to 1.0)
    pub humidity: f64,
    /// Reading timestamp (Unix epoch milliseconds)
    pub timestamp: TimestampMs,
    /// Vertical velocity (m/s), optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_velocity: Option<f64>,
    /// Model anomaly score (0.0 to 1.0), optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
    /// Wind-from direction in degrees (0 = north, clockwise), optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_from_deg: Option<f64>,
    /// Wind shear magnitude (m/s per km), optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_shear: Option<f64>,
}

/// A gridded atmospheric cell for one ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericCell {
    /// Stable grid key derived from the quantized position
    pub cell_id: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Convective available potential energy (J/kg)
    pub cape: f64,
    /// Local rotational tendency of the wind field (1/s)
    pub vorticity: f64,
    /// Relative humidity fraction (0.0 to 1.0)
    pub humidity: f64,
    /// Vertical velocity (m/s), optional
    pub vertical_velocity: Option<f64>,
    /// Model anomaly score (0.0 to 1.0), optional
    pub anomaly_score: Option<f64>,
    /// Wind-from direction in degrees, optional
    pub wind_from_deg: Option<f64>,
    /// Wind shear magnitude, optional
    pub wind_shear: Option<f64>,
    /// Reading timestamp (Unix epoch milliseconds)
    pub timestamp: TimestampMs,
}

impl AtmosphericCell {
    /// Build a cell from a raw reading, deriving its grid key.
    pub fn from_reading(reading: CellReading) -> Self {
        let cell_id = grid_key(reading.lat, reading.lon);
        Self {
            cell_id,
            lat: reading.lat,
            lon: reading.lon,
            cape: reading.cape,
            vorticity: reading.vorticity,
            humidity: reading.humidity,
            vertical_velocity: reading.vertical_velocity,
            anomaly_score: reading.anomaly_score,
            wind_from_deg: reading.wind_from_deg,
            wind_shear: reading.wind_shear,
            timestamp: reading.timestamp,
        }
    }

    /// Get the cell position as a geographic point.
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Check that all required fields carry finite values.
    pub fn has_finite_core_fields(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.cape.is_finite()
            && self.vorticity.is_finite()
            && self.humidity.is_finite()
    }
}

/// Derive a stable grid key from a quantized position.
///
/// Cells are keyed at millidegree resolution so repeated readings for the
/// same grid location map to the same key across cycles.
pub fn grid_key(lat: f64, lon: f64) -> String {
    format!("cell_{:.3}_{:.3}", lat, lon)
}
