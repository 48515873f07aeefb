//! Feedback loop
//!
//! Consumes closed assignments and their simulated results, writes
//! immutable outcome records, and nudges the scorer's weight vector
//! toward features correlated with success and away from those
//! correlated with failure. Updates are bounded so weights cannot drift
//! out of range.

use aethernet_core::config::FeedbackConfig;
use aethernet_core::types::TimestampMs;
use aethernet_domain::assignment::Assignment;
use aethernet_domain::outcome::{FeatureSample, MissionResult, OutcomeRecord};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::scorer::ScoreWeights;
use crate::simulate::SimulatedOutcome;

/// The feedback loop: outcome log plus weight-update policy.
#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    learning_rate: f64,
    weight_floor: f64,
    weight_ceiling: f64,
    recent_window: usize,
    outcomes: BTreeMap<Uuid, OutcomeRecord>,
}

impl FeedbackLoop {
    /// Create a feedback loop from configuration and weight bounds.
    pub fn new(config: &FeedbackConfig, weight_floor: f64, weight_ceiling: f64) -> Self {
        Self {
            learning_rate: config.learning_rate,
            weight_floor,
            weight_ceiling,
            recent_window: config.recent_outcome_window,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record a closed assignment's simulated outcome and fold it into
    /// the weight vector.
    ///
    /// The outcome log is append-only; a duplicate id is refused and
    /// past records are never mutated.
    pub fn record(
        &mut self,
        assignment: &Assignment,
        outcome: &SimulatedOutcome,
        features: FeatureSample,
        weights: &mut ScoreWeights,
        now: TimestampMs,
    ) -> Result<OutcomeRecord> {
        let record = OutcomeRecord::new(
            assignment.assignment_id,
            assignment.agent_id.clone(),
            assignment.cell_id.clone(),
            outcome.result,
            outcome.pattern,
            outcome.intensity,
            features,
            now,
        );
        self.append(record.clone())?;
        self.apply(&record, weights);
        Ok(record)
    }

    /// Append an already-built record (used when merging peer outcomes).
    pub fn append(&mut self, record: OutcomeRecord) -> Result<()> {
        if self.outcomes.contains_key(&record.outcome_id) {
            return Err(EngineError::DuplicateOutcome {
                outcome_id: record.outcome_id.to_string(),
            });
        }
        self.outcomes.insert(record.outcome_id, record);
        Ok(())
    }

    /// Fold one outcome into the weight vector.
    ///
    /// Success moves each weight toward the observed feature value,
    /// failure moves it away; inconclusive results leave weights alone.
    /// Every update clamps to `[floor, ceiling]`.
    pub fn apply(&self, record: &OutcomeRecord, weights: &mut ScoreWeights) {
        let direction = match record.result {
            MissionResult::Success => 1.0,
            MissionResult::Failure => -1.0,
            MissionResult::Inconclusive => return,
        };
        let alpha = self.learning_rate * direction;
        let f = &record.features;

        weights.cape += alpha * (f.cape - weights.cape);
        weights.vorticity += alpha * (f.vorticity - weights.vorticity);
        weights.humidity += alpha * (f.humidity - weights.humidity);
        weights.vertical_velocity += alpha * (f.vertical_velocity - weights.vertical_velocity);
        weights.anomaly += alpha * (f.anomaly - weights.anomaly);

        weights.clamp(self.weight_floor, self.weight_ceiling);
        debug!(?record.result, ?weights, "scoring weights updated");
    }

    /// The most recent records, newest first, bounded by the configured
    /// window. This is what snapshots carry.
    pub fn recent(&self) -> BTreeMap<Uuid, OutcomeRecord> {
        let mut records: Vec<&OutcomeRecord> = self.outcomes.values().collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.recorded_at));
        records
            .into_iter()
            .take(self.recent_window)
            .map(|r| (r.outcome_id, r.clone()))
            .collect()
    }

    /// Look up a record by id.
    pub fn get(&self, outcome_id: &Uuid) -> Option<&OutcomeRecord> {
        self.outcomes.get(outcome_id)
    }

    /// Total recorded outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Check whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
