//! Instability scoring
//!
//! Scores gridded atmospheric cells with a weighted linear combination of
//! normalized features and ranks them highest-instability first. Weights
//! are adjusted at runtime by the feedback loop within configured bounds.

use aethernet_domain::cell::AtmosphericCell;
use aethernet_domain::outcome::FeatureSample;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

use crate::error::{EngineError, Result};

/// Normalization cap for CAPE (J/kg); readings at or above score 1.0.
pub const CAPE_NORM: f64 = 4000.0;
/// Normalization cap for vorticity magnitude (1/s).
pub const VORTICITY_NORM: f64 = 0.0015;
/// Normalization cap for humidity fraction.
pub const HUMIDITY_NORM: f64 = 1.0;
/// Normalization cap for vertical velocity (m/s).
pub const VERTICAL_VELOCITY_NORM: f64 = 3.0;
/// Normalization cap for the model anomaly score.
pub const ANOMALY_NORM: f64 = 1.0;

/// Per-feature scoring weights.
///
/// The defaults reproduce the composite risk model; the feedback loop
/// nudges individual weights within `[floor, ceiling]` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight on normalized CAPE
    pub cape: f64,
    /// Weight on normalized vorticity magnitude
    pub vorticity: f64,
    /// Weight on normalized humidity
    pub humidity: f64,
    /// Weight on normalized vertical velocity
    pub vertical_velocity: f64,
    /// Weight on the normalized anomaly score
    pub anomaly: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cape: 0.25,
            vorticity: 0.25,
            humidity: 0.15,
            vertical_velocity: 0.15,
            anomaly: 0.20,
        }
    }
}

impl ScoreWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.cape + self.vorticity + self.humidity + self.vertical_velocity + self.anomaly
    }

    /// Clamp every weight into `[floor, ceiling]`.
    pub fn clamp(&mut self, floor: f64, ceiling: f64) {
        self.cape = self.cape.clamp(floor, ceiling);
        self.vorticity = self.vorticity.clamp(floor, ceiling);
        self.humidity = self.humidity.clamp(floor, ceiling);
        self.vertical_velocity = self.vertical_velocity.clamp(floor, ceiling);
        self.anomaly = self.anomaly.clamp(floor, ceiling);
    }

    /// Check that every weight lies within `[floor, ceiling]`.
    pub fn within_bounds(&self, floor: f64, ceiling: f64) -> bool {
        [
            self.cape,
            self.vorticity,
            self.humidity,
            self.vertical_velocity,
            self.anomaly,
        ]
        .iter()
        .all(|w| *w >= floor && *w <= ceiling)
    }
}

/// A scored cell for one cycle; no identity beyond the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstabilityScore {
    /// The scored cell
    pub cell: AtmosphericCell,
    /// Composite instability score in [0, 1]
    pub score: f64,
    /// The normalized feature vector behind the score
    pub features: FeatureSample,
}

/// Result of ranking one cycle's readings.
#[derive(Debug, Clone, Default)]
pub struct RankedCells {
    /// Scored cells, highest instability first
    pub ranked: Vec<InstabilityScore>,
    /// Readings skipped as malformed
    pub skipped: usize,
}

/// Extract the normalized feature vector from a cell.
///
/// Absent optional features encode as zero, matching the neutral encoding
/// of the original model. Non-finite values in any present field fail with
/// `InvalidInput`.
pub fn normalize(cell: &AtmosphericCell) -> Result<FeatureSample> {
    if !cell.has_finite_core_fields() {
        return Err(EngineError::InvalidInput {
            cell_id: cell.cell_id.clone(),
            reason: "non-finite required field".to_string(),
        });
    }
    for opt in [
        cell.vertical_velocity,
        cell.anomaly_score,
        cell.wind_from_deg,
        cell.wind_shear,
    ]
    .into_iter()
    .flatten()
    {
        if !opt.is_finite() {
            return Err(EngineError::InvalidInput {
                cell_id: cell.cell_id.clone(),
                reason: "non-finite optional field".to_string(),
            });
        }
    }

    let clamp01 = |value: f64, norm: f64| (value.abs() / norm).min(1.0);

    Ok(FeatureSample {
        cape: clamp01(cell.cape, CAPE_NORM),
        vorticity: clamp01(cell.vorticity, VORTICITY_NORM),
        humidity: clamp01(cell.humidity, HUMIDITY_NORM),
        vertical_velocity: clamp01(cell.vertical_velocity.unwrap_or(0.0), VERTICAL_VELOCITY_NORM),
        anomaly: clamp01(cell.anomaly_score.unwrap_or(0.0), ANOMALY_NORM),
    })
}

/// Compute the composite score from a normalized feature vector.
///
/// Normalizing by the weight total keeps the score in [0, 1] even after
/// the feedback loop has reweighted individual features.
pub fn score_features(features: &FeatureSample, weights: &ScoreWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    (weights.cape * features.cape
        + weights.vorticity * features.vorticity
        + weights.humidity * features.humidity
        + weights.vertical_velocity * features.vertical_velocity
        + weights.anomaly * features.anomaly)
        / total
}

/// Score a single cell.
pub fn score_cell(cell: &AtmosphericCell, weights: &ScoreWeights) -> Result<f64> {
    let features = normalize(cell)?;
    Ok(score_features(&features, weights))
}

/// Score and rank one cycle's cells, highest instability first.
///
/// Malformed cells are skipped with a warning; the cycle continues with
/// the remainder. Ties break on `(lat, lon)` ascending for determinism.
pub fn rank_cells(cells: &[AtmosphericCell], weights: &ScoreWeights) -> RankedCells {
    let mut ranked = Vec::with_capacity(cells.len());
    let mut skipped = 0;

    for cell in cells {
        match normalize(cell) {
            Ok(features) => {
                let score = score_features(&features, weights);
                ranked.push(InstabilityScore {
                    cell: cell.clone(),
                    score,
                    features,
                });
            }
            Err(err) => {
                warn!(cell_id = %cell.cell_id, %err, "skipping malformed cell reading");
                skipped += 1;
            }
        }
    }

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                (a.cell.lat, a.cell.lon)
                    .partial_cmp(&(b.cell.lat, b.cell.lon))
                    .unwrap_or(Ordering::Equal)
            })
    });

    RankedCells { ranked, skipped }
}

/// Take the top K ranked cells.
pub fn top_k(ranked: &RankedCells, k: usize) -> &[InstabilityScore] {
    &ranked.ranked[..ranked.ranked.len().min(k)]
}

/// Decide whether a score merits increased modeling focus.
pub fn merits_focus(score: f64, threshold: f64) -> bool {
    score >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use aethernet_domain::cell::CellReading;
    use proptest::prelude::*;

    fn cell(lat: f64, lon: f64, cape: f64, vorticity: f64, humidity: f64) -> AtmosphericCell {
        AtmosphericCell::from_reading(CellReading {
            lat,
            lon,
            cape,
            vorticity,
            humidity,
            timestamp: 1_700_000_000_000,
            vertical_velocity: None,
            anomaly_score: None,
            wind_from_deg: None,
            wind_shear: None,
        })
    }

    #[test]
    fn test_score_in_unit_interval() {
        let weights = ScoreWeights::default();
        let low = score_cell(&cell(45.0, -122.0, 0.0, 0.0, 0.0), &weights).unwrap();
        let high = score_cell(&cell(45.0, -122.0, 9000.0, 0.01, 1.0), &weights).unwrap();
        assert!(low >= 0.0);
        assert!(high <= 1.0);
        assert!(high > low);
    }

    #[test]
    fn test_normalization_caps() {
        let features = normalize(&cell(45.0, -122.0, 8000.0, 0.003, 1.5)).unwrap();
        assert!((features.cape - 1.0).abs() < f64::EPSILON);
        assert!((features.vorticity - 1.0).abs() < f64::EPSILON);
        assert!((features.humidity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_vorticity_uses_magnitude() {
        let pos = normalize(&cell(45.0, -122.0, 1000.0, 0.00075, 0.5)).unwrap();
        let neg = normalize(&cell(45.0, -122.0, 1000.0, -0.00075, 0.5)).unwrap();
        assert!((pos.vorticity - neg.vorticity).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rank_orders_highest_first() {
        let cells = vec![
            cell(44.0, -121.0, 10.0, 0.0001, 0.5),
            cell(45.0, -122.0, 90.0, 0.0001, 0.5),
            cell(46.0, -123.0, 50.0, 0.0001, 0.5),
        ];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        assert_eq!(ranked.skipped, 0);
        let capes: Vec<f64> = ranked.ranked.iter().map(|s| s.cell.cape).collect();
        assert_eq!(capes, vec![90.0, 50.0, 10.0]);
    }

    #[test]
    fn test_tie_break_by_position() {
        let cells = vec![
            cell(46.0, -121.0, 1000.0, 0.0005, 0.7),
            cell(44.0, -122.0, 1000.0, 0.0005, 0.7),
            cell(44.0, -123.0, 1000.0, 0.0005, 0.7),
        ];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let positions: Vec<(f64, f64)> = ranked
            .ranked
            .iter()
            .map(|s| (s.cell.lat, s.cell.lon))
            .collect();
        assert_eq!(positions, vec![(44.0, -123.0), (44.0, -122.0), (46.0, -121.0)]);
    }

    #[test]
    fn test_malformed_cell_skipped() {
        let mut bad = cell(45.0, -122.0, 1000.0, 0.0005, 0.7);
        bad.humidity = f64::NAN;
        let cells = vec![bad, cell(44.0, -121.0, 1000.0, 0.0005, 0.7)];

        let ranked = rank_cells(&cells, &ScoreWeights::default());
        assert_eq!(ranked.skipped, 1);
        assert_eq!(ranked.ranked.len(), 1);
    }

    #[test]
    fn test_invalid_input_error_names_cell() {
        let mut bad = cell(45.0, -122.0, 1000.0, 0.0005, 0.7);
        bad.cape = f64::INFINITY;
        match score_cell(&bad, &ScoreWeights::default()) {
            Err(EngineError::InvalidInput { cell_id, .. }) => {
                assert_eq!(cell_id, bad.cell_id);
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_top_k_bounds() {
        let cells = vec![
            cell(44.0, -121.0, 10.0, 0.0001, 0.5),
            cell(45.0, -122.0, 90.0, 0.0001, 0.5),
        ];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        assert_eq!(top_k(&ranked, 5).len(), 2);
        assert_eq!(top_k(&ranked, 1).len(), 1);
    }

    #[test]
    fn test_focus_threshold() {
        assert!(merits_focus(0.65, 0.65));
        assert!(!merits_focus(0.64, 0.65));
    }

    proptest! {
        /// If A's features dominate B's in every dimension, score(A) >= score(B).
        #[test]
        fn prop_score_monotone_under_domination(
            cape_b in 0.0f64..4000.0,
            vort_b in 0.0f64..0.0015,
            hum_b in 0.0f64..1.0,
            cape_bump in 0.0f64..1000.0,
            vort_bump in 0.0f64..0.0005,
            hum_bump in 0.0f64..0.3,
        ) {
            let weights = ScoreWeights::default();
            let a = cell(45.0, -122.0, cape_b + cape_bump, vort_b + vort_bump, hum_b + hum_bump);
            let b = cell(45.0, -122.0, cape_b, vort_b, hum_b);
            let score_a = score_cell(&a, &weights).unwrap();
            let score_b = score_cell(&b, &weights).unwrap();
            prop_assert!(score_a >= score_b - 1e-12);
        }
    }
}
