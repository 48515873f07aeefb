//! Agent roster
//!
//! Maintains the current agent set: registration, heartbeats, timeout
//! sweeps, wear accounting, and policy-driven role rotation. Status
//! mutation flows through the roster and the coordinator only.

use aethernet_core::config::RosterConfig;
use aethernet_core::types::{GeoPoint, TimestampMs};
use aethernet_domain::agent::{Agent, AgentStatus};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// The fleet roster.
#[derive(Debug, Clone)]
pub struct Roster {
    agents: BTreeMap<String, Agent>,
    config: RosterConfig,
    last_rotation: TimestampMs,
}

impl Roster {
    /// Create an empty roster.
    pub fn new(config: RosterConfig) -> Self {
        Self {
            agents: BTreeMap::new(),
            config,
            last_rotation: 0,
        }
    }

    /// Register an agent at fleet initialization.
    pub fn register(&mut self, agent: Agent) {
        debug!(agent_id = %agent.agent_id, role = ?agent.role, "agent registered");
        self.agents.insert(agent.agent_id.clone(), agent);
    }

    /// Record a heartbeat for an agent.
    ///
    /// An Offline agent returns to Idle; position and last-seen refresh.
    /// Returns the agent's status after the heartbeat.
    pub fn heartbeat(
        &mut self,
        agent_id: &str,
        position: GeoPoint,
        now: TimestampMs,
    ) -> Result<AgentStatus> {
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| EngineError::UnknownAgent {
                agent_id: agent_id.to_string(),
            })?;
        let was_offline = agent.status == AgentStatus::Offline;
        agent.record_heartbeat(position, now)?;
        if was_offline {
            info!(agent_id, "agent back online after heartbeat");
        }
        Ok(agent.status)
    }

    /// Sweep the roster for missed heartbeats.
    ///
    /// Each lapsed agent transitions to Offline and yields a non-fatal
    /// `AgentTimeout` error for the caller to log and count.
    pub fn sweep(&mut self, now: TimestampMs) -> Vec<EngineError> {
        let timeout = self.config.heartbeat_timeout_ms;
        let mut timeouts = Vec::new();

        for agent in self.agents.values_mut() {
            if agent.status == AgentStatus::Offline {
                continue;
            }
            if agent.is_heartbeat_expired(now, timeout) {
                // Transition table allows Offline from any live status
                let _ = agent.transition(AgentStatus::Offline);
                timeouts.push(EngineError::AgentTimeout {
                    agent_id: agent.agent_id.clone(),
                    last_seen: agent.last_seen,
                });
            }
        }

        timeouts
    }

    /// Agents currently eligible for assignment.
    pub fn eligible_agents(&self) -> Vec<&Agent> {
        self.agents.values().filter(|a| a.is_eligible()).collect()
    }

    /// Ids of agents currently Offline.
    pub fn offline_ids(&self) -> Vec<String> {
        self.agents
            .values()
            .filter(|a| a.status == AgentStatus::Offline)
            .map(|a| a.agent_id.clone())
            .collect()
    }

    /// Rotate roles round-robin if the rotation interval has elapsed.
    ///
    /// Only Idle and OnStation agents take part, ordered by descending
    /// wear so the most worn agents shift roles first. Returns the number
    /// of agents rotated.
    pub fn maybe_rotate_roles(&mut self, now: TimestampMs) -> usize {
        if now.saturating_sub(self.last_rotation) < self.config.rotation_interval_ms {
            return 0;
        }
        self.last_rotation = now;

        let mut rotating: Vec<&mut Agent> = self
            .agents
            .values_mut()
            .filter(|a| matches!(a.status, AgentStatus::Idle | AgentStatus::OnStation))
            .collect();
        rotating.sort_by(|a, b| {
            b.wear
                .partial_cmp(&a.wear)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let rotated = rotating.len();
        for agent in rotating {
            let next = agent.role.next_in_rotation();
            debug!(agent_id = %agent.agent_id, from = ?agent.role, to = ?next, "role rotated");
            agent.role = next;
        }

        if rotated > 0 {
            info!(rotated, "role rotation applied");
        }
        rotated
    }

    /// Accrue wear for the cycle: active agents wear down, idle agents
    /// recover toward zero.
    pub fn accrue_wear(&mut self) {
        for agent in self.agents.values_mut() {
            match agent.status {
                AgentStatus::EnRoute | AgentStatus::OnStation | AgentStatus::Degraded => {
                    agent.wear = (agent.wear + self.config.wear_per_cycle).min(1.0);
                }
                AgentStatus::Idle => {
                    agent.wear = (agent.wear - self.config.wear_recovery_per_cycle).max(0.0);
                }
                AgentStatus::Offline => {}
            }
        }
    }

    /// Get an agent by id.
    pub fn get(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    /// Get a mutable reference to an agent.
    pub fn get_mut(&mut self, agent_id: &str) -> Option<&mut Agent> {
        self.agents.get_mut(agent_id)
    }

    /// Iterate over all agents.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Iterate mutably over all agents.
    pub fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    /// Clone the agent map for snapshot construction.
    pub fn to_map(&self) -> BTreeMap<String, Agent> {
        self.agents.clone()
    }

    /// Total agent count.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
