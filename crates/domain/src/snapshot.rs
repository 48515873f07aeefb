//! Shared-state snapshot
//!
//! The serializable union of current agents, assignments, and recent
//! outcome records exchanged by the sync layer. Every assignment's agent
//! reference must resolve within the same snapshot.

use aethernet_core::types::TimestampMs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::agent::Agent;
use crate::assignment::Assignment;
use crate::error::{DomainError, Result};
use crate::outcome::OutcomeRecord;

/// The shared state exchanged between simulated peers.
///
/// Entity maps are keyed by id so last-write-wins merging stays simple;
/// `BTreeMap` keeps serialization order deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedStateSnapshot {
    /// Originating node
    pub node_id: String,

    /// Monotonic snapshot sequence number per node
    pub seq: u64,

    /// Snapshot creation timestamp (Unix epoch milliseconds)
    pub issued_at: TimestampMs,

    /// Current agents keyed by agent id
    pub agents: BTreeMap<String, Agent>,

    /// Current assignments keyed by assignment id
    pub assignments: BTreeMap<Uuid, Assignment>,

    /// Recent outcome records keyed by outcome id
    pub outcomes: BTreeMap<Uuid, OutcomeRecord>,
}

impl SharedStateSnapshot {
    /// Build a snapshot, enforcing referential integrity.
    pub fn new(
        node_id: String,
        seq: u64,
        issued_at: TimestampMs,
        agents: BTreeMap<String, Agent>,
        assignments: BTreeMap<Uuid, Assignment>,
        outcomes: BTreeMap<Uuid, OutcomeRecord>,
    ) -> Result<Self> {
        let snapshot = Self {
            node_id,
            seq,
            issued_at,
            agents,
            assignments,
            outcomes,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that every assignment's agent resolves within this snapshot.
    pub fn validate(&self) -> Result<()> {
        for assignment in self.assignments.values() {
            if !self.agents.contains_key(&assignment.agent_id) {
                return Err(DomainError::DanglingAgentReference {
                    assignment_id: assignment.assignment_id.to_string(),
                    agent_id: assignment.agent_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Timestamp used for last-write-wins comparison of an agent record.
    pub fn agent_timestamp(agent: &Agent) -> TimestampMs {
        agent.last_seen
    }

    /// Timestamp used for last-write-wins comparison of an assignment.
    pub fn assignment_timestamp(assignment: &Assignment) -> TimestampMs {
        assignment.updated_at
    }

    /// Timestamp used for last-write-wins comparison of an outcome record.
    pub fn outcome_timestamp(outcome: &OutcomeRecord) -> TimestampMs {
        outcome.recorded_at
    }
}
