//! Mission outcome records
//!
//! An outcome record is written once when a simulated mission window
//! closes and is never mutated afterwards. Records feed the feedback
//! loop's scoring-weight updates.

use aethernet_core::types::TimestampMs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Simulated mission result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionResult {
    /// The modeled objective was met
    Success,
    /// The modeled objective was not met
    Failure,
    /// The simulation window closed without a usable signal
    Inconclusive,
}

/// Behaviour pattern flown during the simulated mission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviourPattern {
    /// Tight spiral over the target cell
    Spiral,
    /// Zigzag sweep across the target cell
    Zigzag,
}

/// Normalized feature vector observed at the target, mirrored into the
/// outcome record so the feedback loop can correlate features with results.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSample {
    /// Normalized CAPE
    pub cape: f64,
    /// Normalized vorticity magnitude
    pub vorticity: f64,
    /// Normalized humidity
    pub humidity: f64,
    /// Normalized vertical velocity
    pub vertical_velocity: f64,
    /// Normalized anomaly score
    pub anomaly: f64,
}

/// Immutable record of one closed assignment's simulated outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Unique record identifier
    pub outcome_id: Uuid,

    /// Closed assignment this outcome belongs to
    pub assignment_id: Uuid,

    /// Agent that held the assignment
    pub agent_id: String,

    /// Target cell grid key
    pub cell_id: String,

    /// Simulated result
    pub result: MissionResult,

    /// Behaviour pattern flown
    pub pattern: BehaviourPattern,

    /// Modeled intensity of the behaviour (0.0 to 1.0)
    pub intensity: f64,

    /// Feature vector observed at the target
    pub features: FeatureSample,

    /// Record creation timestamp (Unix epoch milliseconds)
    pub recorded_at: TimestampMs,
}

impl OutcomeRecord {
    /// Create a new outcome record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        assignment_id: Uuid,
        agent_id: String,
        cell_id: String,
        result: MissionResult,
        pattern: BehaviourPattern,
        intensity: f64,
        features: FeatureSample,
        recorded_at: TimestampMs,
    ) -> Self {
        Self {
            outcome_id: Uuid::new_v4(),
            assignment_id,
            agent_id,
            cell_id,
            result,
            pattern,
            intensity,
            features,
            recorded_at,
        }
    }
}
