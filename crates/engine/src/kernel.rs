//! Tick kernel
//!
//! Sequences one coordination cycle through an explicit phase machine:
//! Idle → Scoring → Coordinating → Feedback → Synced → Idle. Scoring and
//! the heartbeat sweep run in parallel inside the Scoring phase (they
//! touch disjoint state) and join before coordination. A cycle-level
//! cancel signal aborts the coordinator pass without partial commits.

use aethernet_core::config::Config;
use aethernet_core::types::TimestampMs;
use aethernet_domain::agent::{AgentStatus, GeometryBias};
use aethernet_domain::assignment::Assignment;
use aethernet_domain::cell::{AtmosphericCell, CellReading};
use aethernet_domain::snapshot::SharedStateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coordinator::Coordinator;
use crate::error::{EngineError, Result};
use crate::feedback::FeedbackLoop;
use crate::geometry::{suggest_geometry, AlignmentMode};
use crate::roster::Roster;
use crate::scorer::{self, ScoreWeights};
use crate::simulate::MissionSimulator;

/// Phases of one coordination cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickPhase {
    /// Between cycles
    Idle,
    /// Ingesting and scoring cells; heartbeat sweep runs alongside
    Scoring,
    /// Matching targets to agents
    Coordinating,
    /// Closing windows, recording outcomes, updating weights
    Feedback,
    /// Snapshot produced and handed to the sync layer
    Synced,
}

impl TickPhase {
    /// Check if transition to a new phase is valid.
    pub fn can_transition_to(&self, new_phase: TickPhase) -> bool {
        match (self, new_phase) {
            (TickPhase::Idle, TickPhase::Scoring) => true,
            (TickPhase::Scoring, TickPhase::Coordinating) => true,
            (TickPhase::Coordinating, TickPhase::Feedback) => true,
            (TickPhase::Feedback, TickPhase::Synced) => true,
            (TickPhase::Synced, TickPhase::Idle) => true,
            // A cancelled cycle aborts back to Idle from any live phase
            (p, TickPhase::Idle) if *p != TickPhase::Idle => true,
            _ => false,
        }
    }
}

/// Cycle-level cancellation signal.
///
/// Cloned into whoever may need to abort the cycle; checked at phase
/// boundaries and immediately before the coordinator commit.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the in-flight cycle.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a single coordination cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle sequence number
    pub seq: u64,
    /// Cycle start timestamp (Unix epoch milliseconds)
    pub started_at: TimestampMs,
    /// Whether the cycle was cancelled before the coordinator commit
    pub cancelled: bool,
    /// Cells scored this cycle
    pub scored: usize,
    /// Malformed readings skipped
    pub skipped: usize,
    /// Assignments committed
    pub assigned: usize,
    /// Assignments released (offline agent or score collapse)
    pub released: usize,
    /// Assignment windows closed with outcomes recorded
    pub closed: usize,
    /// Agents that missed their heartbeat window
    pub timeouts: Vec<String>,
    /// Agents whose roles rotated
    pub rotated: usize,
}

/// The coordination kernel: per-cycle state plus the phase machine.
#[derive(Debug)]
pub struct Kernel {
    node_id: String,
    config: Config,
    weights: ScoreWeights,
    roster: Roster,
    assignments: BTreeMap<Uuid, Assignment>,
    feedback: FeedbackLoop,
    coordinator: Coordinator,
    simulator: MissionSimulator,
    phase: TickPhase,
    seq: u64,
}

impl Kernel {
    /// Create a kernel from configuration with a seeded simulator.
    pub fn new(config: Config, simulator_seed: u64) -> Self {
        let coordinator = Coordinator::new(&config.coordination);
        let feedback = FeedbackLoop::new(
            &config.feedback,
            config.scoring.weight_floor,
            config.scoring.weight_ceiling,
        );
        let roster = Roster::new(config.roster.clone());
        Self {
            node_id: config.node.node_id.clone(),
            config,
            weights: ScoreWeights::default(),
            roster,
            assignments: BTreeMap::new(),
            feedback,
            coordinator,
            simulator: MissionSimulator::new(simulator_seed),
            phase: TickPhase::Idle,
            seq: 0,
        }
    }

    /// Current tick phase.
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Current scoring weights.
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// The fleet roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Mutable roster access for fleet initialization and heartbeats.
    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// Current assignments keyed by id.
    pub fn assignments(&self) -> &BTreeMap<Uuid, Assignment> {
        &self.assignments
    }

    /// Transition the phase machine, rejecting out-of-order moves.
    fn set_phase(&mut self, phase: TickPhase) -> Result<()> {
        if !self.phase.can_transition_to(phase) {
            return Err(EngineError::InvalidPhase {
                from: self.phase,
                to: phase,
            });
        }
        debug!(from = ?self.phase, to = ?phase, "tick phase transition");
        self.phase = phase;
        Ok(())
    }

    /// Convert raw readings into cells for this cycle.
    pub fn ingest(readings: &[CellReading]) -> Vec<AtmosphericCell> {
        readings
            .iter()
            .cloned()
            .map(AtmosphericCell::from_reading)
            .collect()
    }

    /// Run one coordination cycle.
    ///
    /// Scoring and the heartbeat sweep run concurrently (disjoint state)
    /// and join before the coordinator pass. A cancel observed before the
    /// coordinator commit aborts the cycle with no partial assignments.
    pub async fn run_cycle(
        &mut self,
        readings: &[CellReading],
        cancel: &CancelToken,
        now: TimestampMs,
    ) -> Result<CycleReport> {
        self.seq += 1;
        let mut report = CycleReport {
            seq: self.seq,
            started_at: now,
            ..Default::default()
        };

        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        // --- Scoring (cells scored in parallel with the heartbeat sweep) ---
        self.set_phase(TickPhase::Scoring)?;
        let cells = Self::ingest(readings);
        let weights = self.weights;
        let roster = &mut self.roster;
        let (ranked, timeouts) = tokio::join!(
            async move { scorer::rank_cells(&cells, &weights) },
            async move { roster.sweep(now) },
        );
        report.scored = ranked.ranked.len();
        report.skipped = ranked.skipped;
        for timeout in &timeouts {
            warn!(%timeout, "heartbeat sweep");
            if let EngineError::AgentTimeout { agent_id, .. } = timeout {
                report.timeouts.push(agent_id.clone());
            }
        }

        // Release assignments invalidated by offline agents or collapsed
        // scores before planning new ones
        let fresh_scores: HashMap<String, f64> = ranked
            .ranked
            .iter()
            .map(|s| (s.cell.cell_id.clone(), s.score))
            .collect();
        report.released = self.coordinator.release_invalidated(
            &mut self.roster,
            &mut self.assignments,
            &fresh_scores,
            now,
        );

        // Agents dispatched last cycle arrive on station this cycle
        for agent in self.roster.agents_mut() {
            if agent.status == AgentStatus::EnRoute && agent.assigned_target.is_some() {
                let _ = agent.transition(AgentStatus::OnStation);
            }
        }

        // --- Coordination ---
        self.set_phase(TickPhase::Coordinating)?;
        let assigned_cells: Vec<&str> = self
            .assignments
            .values()
            .filter(|a| a.is_active())
            .map(|a| a.cell_id.as_str())
            .collect();
        let targets: Vec<_> = scorer::top_k(&ranked, self.config.scoring.top_k)
            .iter()
            .filter(|s| !assigned_cells.contains(&s.cell.cell_id.as_str()))
            .cloned()
            .collect();

        match self
            .coordinator
            .coordinate(&mut self.roster, &targets, cancel, now)
        {
            Ok(new_assignments) => {
                report.assigned = new_assignments.len();
                for assignment in new_assignments {
                    // Annotate the assigned agent with declarative geometry
                    // advice for the target
                    if let Some(target) =
                        targets.iter().find(|t| t.cell.cell_id == assignment.cell_id)
                    {
                        let advice = suggest_geometry(&target.cell, AlignmentMode::Crosswind);
                        if let Some(agent) = self.roster.get_mut(&assignment.agent_id) {
                            agent.apply_geometry_bias(GeometryBias {
                                heading_deg: advice.desired_heading_deg,
                                bank_deg: Some(advice.bank_deg),
                                angle_of_attack_deg: Some(advice.angle_of_attack_deg),
                            });
                        }
                    }
                    self.assignments.insert(assignment.assignment_id, assignment);
                }
            }
            Err(EngineError::Cancelled) => {
                info!(seq = self.seq, "cycle cancelled before coordinator commit");
                report.cancelled = true;
                self.set_phase(TickPhase::Idle)?;
                return Ok(report);
            }
            Err(other) => return Err(other),
        }

        // --- Feedback (close expired windows, record outcomes) ---
        self.set_phase(TickPhase::Feedback)?;
        let mut closed_ids = Vec::new();
        for assignment in self.assignments.values_mut() {
            if assignment.is_active() && assignment.is_expired(now) {
                assignment.close(now)?;
                closed_ids.push(assignment.assignment_id);
            }
        }
        for id in &closed_ids {
            let assignment = match self.assignments.get(id) {
                Some(a) => a.clone(),
                None => continue,
            };
            // Fall back to neutral features when the cell vanished from
            // this cycle's payload
            let features = ranked
                .ranked
                .iter()
                .find(|s| s.cell.cell_id == assignment.cell_id)
                .map(|s| s.features)
                .unwrap_or_default();
            let outcome = self.simulator.simulate(&assignment, &features);
            self.feedback
                .record(&assignment, &outcome, features, &mut self.weights, now)?;

            if let Some(agent) = self.roster.get_mut(&assignment.agent_id) {
                agent.assigned_target = None;
                if matches!(agent.status, AgentStatus::EnRoute | AgentStatus::OnStation) {
                    let _ = agent.transition(AgentStatus::Idle);
                }
            }
        }
        report.closed = closed_ids.len();

        // Wear accounting and policy-driven role rotation
        self.roster.accrue_wear();
        report.rotated = self.roster.maybe_rotate_roles(now);

        // Terminal assignments have served their purpose; outcomes carry
        // the history forward
        self.assignments.retain(|_, a| a.is_active());

        // --- Synced ---
        self.set_phase(TickPhase::Synced)?;
        self.set_phase(TickPhase::Idle)?;

        info!(
            seq = report.seq,
            scored = report.scored,
            skipped = report.skipped,
            assigned = report.assigned,
            released = report.released,
            closed = report.closed,
            "cycle complete"
        );
        Ok(report)
    }

    /// Produce the shared-state snapshot for broadcast.
    pub fn snapshot(&self, now: TimestampMs) -> Result<SharedStateSnapshot> {
        let snapshot = SharedStateSnapshot::new(
            self.node_id.clone(),
            self.seq,
            now,
            self.roster.to_map(),
            self.assignments.clone(),
            self.feedback.recent(),
        )?;
        Ok(snapshot)
    }

    /// Fold a merged peer snapshot's outcome records into the local log.
    ///
    /// Records already present are skipped; the log never rewrites
    /// history.
    pub fn absorb_peer_outcomes(&mut self, snapshot: &SharedStateSnapshot) -> usize {
        let mut absorbed = 0;
        for record in snapshot.outcomes.values() {
            if self.feedback.get(&record.outcome_id).is_none()
                && self.feedback.append(record.clone()).is_ok()
            {
                absorbed += 1;
            }
        }
        absorbed
    }
}
