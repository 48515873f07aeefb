//! Mission-outcome simulation
//!
//! Rolls a simulated result for each closed assignment window. Pattern
//! choice follows the humidity heuristic; success probability scales with
//! the target's score at assignment time. The RNG is injected so runs are
//! reproducible.

use aethernet_domain::assignment::Assignment;
use aethernet_domain::outcome::{BehaviourPattern, FeatureSample, MissionResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Humidity above which a zigzag sweep replaces the spiral pattern.
const ZIGZAG_HUMIDITY_THRESHOLD: f64 = 0.75;

/// Fraction of non-success rolls that land Failure (the rest are
/// Inconclusive).
const FAILURE_SHARE: f64 = 0.8;

/// Result of one simulated mission window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedOutcome {
    /// Rolled result
    pub result: MissionResult,
    /// Pattern flown
    pub pattern: BehaviourPattern,
    /// Modeled intensity (0.6 to 1.0)
    pub intensity: f64,
}

/// Deterministic mission simulator.
#[derive(Debug)]
pub struct MissionSimulator {
    rng: StdRng,
}

impl MissionSimulator {
    /// Create a simulator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick a behaviour pattern for the target's conditions.
    pub fn choose_pattern(features: &FeatureSample) -> BehaviourPattern {
        if features.humidity > ZIGZAG_HUMIDITY_THRESHOLD {
            BehaviourPattern::Zigzag
        } else {
            BehaviourPattern::Spiral
        }
    }

    /// Roll an outcome for a closed assignment.
    pub fn simulate(&mut self, assignment: &Assignment, features: &FeatureSample) -> SimulatedOutcome {
        let pattern = Self::choose_pattern(features);
        let intensity = self.rng.gen_range(0.6..=1.0);

        // Higher-scored targets are modeled as more likely to produce a
        // usable success signal
        let success_p = 0.25 + 0.5 * assignment.score_at_assignment;
        let roll: f64 = self.rng.gen();
        let result = if roll < success_p {
            MissionResult::Success
        } else if roll < success_p + (1.0 - success_p) * FAILURE_SHARE {
            MissionResult::Failure
        } else {
            MissionResult::Inconclusive
        };

        debug!(
            assignment_id = %assignment.assignment_id,
            ?result,
            ?pattern,
            intensity,
            "mission window simulated"
        );
        SimulatedOutcome {
            result,
            pattern,
            intensity,
        }
    }
}
