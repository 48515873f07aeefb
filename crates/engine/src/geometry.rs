//! Flight-geometry advice
//!
//! Derives a declarative heading/bank/angle-of-attack recommendation from
//! a cell's wind field. The advice is an annotation on agent records for
//! modeling purposes; no vehicle layer consumes it here.

use aethernet_domain::cell::AtmosphericCell;
use serde::{Deserialize, Serialize};

/// Alignment of the suggested heading relative to the wind-from direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Head into the wind
    Upwind,
    /// Run with the wind
    Downwind,
    /// Track perpendicular to the wind
    Crosswind,
}

/// Declarative geometry recommendation for one target cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryAdvice {
    /// Desired heading in degrees, None when the wind direction is unknown
    pub desired_heading_deg: Option<f64>,
    /// Yaw offset applied across the formation, degrees
    pub formation_yaw_offset_deg: f64,
    /// Bank angle, degrees
    pub bank_deg: f64,
    /// Angle of attack, degrees
    pub angle_of_attack_deg: f64,
    /// Alignment mode the heading was derived under
    pub alignment_mode: AlignmentMode,
}

const BASE_YAW_OFFSET_DEG: f64 = 10.0;
const BASE_BANK_DEG: f64 = 5.0;
const BASE_AOA_DEG: f64 = 2.0;

/// Derive a heading from the wind-from direction. 0 = north, clockwise.
pub fn heading_from_wind(wind_from_deg: f64, mode: AlignmentMode) -> f64 {
    let wind_from = (wind_from_deg % 360.0 + 360.0) % 360.0;
    match mode {
        AlignmentMode::Upwind => wind_from,
        AlignmentMode::Downwind => (wind_from + 180.0) % 360.0,
        AlignmentMode::Crosswind => (wind_from + 90.0) % 360.0,
    }
}

/// Produce a geometry recommendation for a cell.
///
/// Yaw offset grows modestly under higher shear; bank gets a small bump
/// from a stronger vorticity signal. Both adjustments are capped.
pub fn suggest_geometry(cell: &AtmosphericCell, mode: AlignmentMode) -> GeometryAdvice {
    let desired_heading_deg = cell.wind_from_deg.map(|w| heading_from_wind(w, mode));

    let shear = cell.wind_shear.unwrap_or(0.0);
    let yaw = BASE_YAW_OFFSET_DEG + (shear / 5.0).min(10.0);
    let bank = BASE_BANK_DEG + (cell.vorticity.abs() * 500.0).min(3.0);

    GeometryAdvice {
        desired_heading_deg,
        formation_yaw_offset_deg: yaw,
        bank_deg: bank,
        angle_of_attack_deg: BASE_AOA_DEG,
        alignment_mode: mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aethernet_domain::cell::CellReading;

    fn cell_with_wind(wind_from_deg: Option<f64>, wind_shear: Option<f64>) -> AtmosphericCell {
        AtmosphericCell::from_reading(CellReading {
            lat: 45.0,
            lon: -122.0,
            cape: 2100.0,
            vorticity: 0.0008,
            humidity: 0.88,
            timestamp: 1_700_000_000_000,
            vertical_velocity: None,
            anomaly_score: None,
            wind_from_deg,
            wind_shear,
        })
    }

    #[test]
    fn test_heading_modes() {
        assert!((heading_from_wind(90.0, AlignmentMode::Upwind) - 90.0).abs() < 1e-9);
        assert!((heading_from_wind(90.0, AlignmentMode::Downwind) - 270.0).abs() < 1e-9);
        assert!((heading_from_wind(90.0, AlignmentMode::Crosswind) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_wraps_into_range() {
        assert!((heading_from_wind(350.0, AlignmentMode::Crosswind) - 80.0).abs() < 1e-9);
        assert!((heading_from_wind(-10.0, AlignmentMode::Upwind) - 350.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_wind_means_no_heading() {
        let advice = suggest_geometry(&cell_with_wind(None, None), AlignmentMode::Crosswind);
        assert!(advice.desired_heading_deg.is_none());
        assert_eq!(advice.alignment_mode, AlignmentMode::Crosswind);
    }

    #[test]
    fn test_shear_boost_is_capped() {
        let calm = suggest_geometry(&cell_with_wind(Some(0.0), Some(0.0)), AlignmentMode::Crosswind);
        let sheared =
            suggest_geometry(&cell_with_wind(Some(0.0), Some(500.0)), AlignmentMode::Crosswind);
        assert!((calm.formation_yaw_offset_deg - 10.0).abs() < 1e-9);
        assert!((sheared.formation_yaw_offset_deg - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_bank_bump_from_vorticity() {
        let advice = suggest_geometry(&cell_with_wind(Some(135.0), None), AlignmentMode::Upwind);
        // 5.0 base + 0.0008 * 500 = 5.4
        assert!((advice.bank_deg - 5.4).abs() < 1e-9);
        assert!((advice.angle_of_attack_deg - 2.0).abs() < 1e-9);
    }
}
