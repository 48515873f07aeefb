//! Simulated agent domain model
//!
//! Agents are created at fleet initialization; role and assignment are
//! mutated only by the coordinator and roster operations. An agent goes
//! Offline on a missed heartbeat and returns to Idle on the next one.

use aethernet_core::types::{GeoPoint, TimestampMs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DomainError, Result};

/// Agent role within the simulated swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    /// Scans candidate patches and reports readings
    Scanner,
    /// Relays state between swarm members
    Relay,
    /// Executes the mission behaviour on station
    Operator,
    /// Standby unit held back for failure recovery
    Fallback,
}

impl AgentRole {
    /// Next role in the round-robin rotation order.
    pub fn next_in_rotation(&self) -> AgentRole {
        match self {
            AgentRole::Scanner => AgentRole::Relay,
            AgentRole::Relay => AgentRole::Operator,
            AgentRole::Operator => AgentRole::Fallback,
            AgentRole::Fallback => AgentRole::Scanner,
        }
    }
}

/// Agent lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Available for assignment
    Idle,
    /// Traveling to an assigned target
    EnRoute,
    /// Holding position over the assigned target
    OnStation,
    /// Operational but impaired; excluded from assignment
    Degraded,
    /// Missed heartbeat; excluded from everything until it reports in
    Offline,
}

impl AgentStatus {
    /// Check if transition to a new status is valid.
    pub fn can_transition_to(&self, new_status: AgentStatus) -> bool {
        match (self, new_status) {
            // Any live status can drop Offline on a missed heartbeat
            (s, AgentStatus::Offline) if *s != AgentStatus::Offline => true,
            // Offline agents only come back through a heartbeat, to Idle
            (AgentStatus::Offline, AgentStatus::Idle) => true,
            (AgentStatus::Offline, _) => false,
            // Assignment lifecycle
            (AgentStatus::Idle, AgentStatus::EnRoute) => true,
            (AgentStatus::EnRoute, AgentStatus::OnStation) => true,
            (AgentStatus::EnRoute, AgentStatus::Idle) => true,
            (AgentStatus::OnStation, AgentStatus::Idle) => true,
            // Degradation can strike any live status, and recovers to Idle
            (s, AgentStatus::Degraded) if *s != AgentStatus::Degraded => true,
            (AgentStatus::Degraded, AgentStatus::Idle) => true,
            _ => false,
        }
    }
}

/// Declarative flight-geometry annotation stored on an agent record.
///
/// Purely advisory; downstream vehicle layers are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryBias {
    /// Desired heading in degrees (0 = north, clockwise)
    pub heading_deg: Option<f64>,
    /// Desired bank angle in degrees
    pub bank_deg: Option<f64>,
    /// Desired angle of attack in degrees
    pub angle_of_attack_deg: Option<f64>,
}

/// A simulated swarm agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier
    pub agent_id: String,

    /// Current role
    pub role: AgentRole,

    /// Current lifecycle status
    pub status: AgentStatus,

    /// Current latitude
    pub latitude: f64,

    /// Current longitude
    pub longitude: f64,

    /// Modeled wear (0.0 fresh to 1.0 spent); not physical fuel
    pub wear: f64,

    /// Assigned target cell grid key, if any
    pub assigned_target: Option<String>,

    /// Last heartbeat timestamp (Unix epoch milliseconds)
    pub last_seen: TimestampMs,

    /// Declarative geometry annotation, if any
    pub geometry_bias: Option<GeometryBias>,

    /// Additional metadata
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Agent {
    /// Create a new agent at fleet initialization.
    pub fn new(
        agent_id: String,
        role: AgentRole,
        latitude: f64,
        longitude: f64,
        timestamp: TimestampMs,
    ) -> Self {
        Self {
            agent_id,
            role,
            status: AgentStatus::Idle,
            latitude,
            longitude,
            wear: 0.0,
            assigned_target: None,
            last_seen: timestamp,
            geometry_bias: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Get the agent position as a geographic point.
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Transition to a new status, enforcing the transition table.
    pub fn transition(&mut self, new_status: AgentStatus) -> Result<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: new_status,
            });
        }
        self.status = new_status;
        Ok(())
    }

    /// Check assignment eligibility: Idle agents without a target.
    pub fn is_eligible(&self) -> bool {
        self.status == AgentStatus::Idle && self.assigned_target.is_none()
    }

    /// Record a heartbeat: refresh position and last-seen, and bring an
    /// Offline agent back to Idle.
    pub fn record_heartbeat(&mut self, position: GeoPoint, timestamp: TimestampMs) -> Result<()> {
        self.latitude = position.lat;
        self.longitude = position.lon;
        self.last_seen = timestamp;
        if self.status == AgentStatus::Offline {
            self.transition(AgentStatus::Idle)?;
        }
        Ok(())
    }

    /// Check whether the heartbeat window has lapsed.
    pub fn is_heartbeat_expired(&self, now: TimestampMs, timeout_ms: u64) -> bool {
        now.saturating_sub(self.last_seen) >= timeout_ms
    }

    /// Store a declarative geometry annotation on the agent record.
    pub fn apply_geometry_bias(&mut self, bias: GeometryBias) {
        self.geometry_bias = Some(bias);
    }
}
