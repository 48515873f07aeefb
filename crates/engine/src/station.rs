//! Base-station planning
//!
//! Rotation scheduling, backup assignment, and mission envelope updates.
//! The station emits events; the node broadcasts them alongside state
//! snapshots.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::roster::Roster;

/// Operating envelope pushed by the base station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionEnvelope {
    /// Named operating region
    pub region: String,
    /// Permitted simulation altitudes in meters
    pub altitudes_m: Vec<f64>,
}

/// Events emitted by base-station planning operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StationEvent {
    /// Swap-out order for worn agents, highest wear first
    RotationSchedule {
        /// Agent ids in rotation order
        order: Vec<String>,
    },
    /// A standby unit was (or could not be) assigned as backup
    BackupAssigned {
        /// Cluster requesting the backup
        cluster_id: String,
        /// Assigned unit, None when the standby pool is empty
        agent_id: Option<String>,
    },
    /// The mission envelope changed
    EnvelopeUpdated {
        /// New envelope
        envelope: MissionEnvelope,
    },
}

/// Base-station planner state.
#[derive(Debug, Clone, Default)]
pub struct BaseStation {
    standby: Vec<String>,
    envelope: Option<MissionEnvelope>,
}

impl BaseStation {
    /// Create a station with a standby pool of fallback unit ids.
    pub fn new(standby: Vec<String>) -> Self {
        Self {
            standby,
            envelope: None,
        }
    }

    /// Produce a swap-out rotation plan, most worn agents first.
    pub fn rotation_plan(&self, roster: &Roster) -> StationEvent {
        let mut by_wear: Vec<(&str, f64)> = roster
            .agents()
            .map(|a| (a.agent_id.as_str(), a.wear))
            .collect();
        by_wear.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let order: Vec<String> = by_wear.into_iter().map(|(id, _)| id.to_string()).collect();
        info!(agents = order.len(), "rotation plan issued");
        StationEvent::RotationSchedule { order }
    }

    /// Pop a standby unit as backup for a cluster.
    pub fn assign_backup(&mut self, cluster_id: &str) -> StationEvent {
        let agent_id = self.standby.pop();
        info!(cluster_id, ?agent_id, "backup unit assignment");
        StationEvent::BackupAssigned {
            cluster_id: cluster_id.to_string(),
            agent_id,
        }
    }

    /// Update the mission envelope.
    pub fn update_envelope(&mut self, envelope: MissionEnvelope) -> StationEvent {
        self.envelope = Some(envelope.clone());
        info!(region = %envelope.region, "mission envelope updated");
        StationEvent::EnvelopeUpdated { envelope }
    }

    /// Current envelope, if one has been pushed.
    pub fn envelope(&self) -> Option<&MissionEnvelope> {
        self.envelope.as_ref()
    }

    /// Remaining standby units.
    pub fn standby_remaining(&self) -> usize {
        self.standby.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aethernet_domain::agent::{Agent, AgentRole};

    fn roster_with_wear(wear: &[f64]) -> Roster {
        let mut roster = Roster::new(Default::default());
        for (i, w) in wear.iter().enumerate() {
            let mut agent = Agent::new(
                format!("unit-{i:03}"),
                AgentRole::Scanner,
                45.0,
                -122.0,
                1_000,
            );
            agent.wear = *w;
            roster.register(agent);
        }
        roster
    }

    #[test]
    fn test_rotation_plan_highest_wear_first() {
        let roster = roster_with_wear(&[0.3, 0.9, 0.1]);
        let station = BaseStation::default();

        match station.rotation_plan(&roster) {
            StationEvent::RotationSchedule { order } => {
                assert_eq!(order, vec!["unit-001", "unit-000", "unit-002"]);
            }
            other => panic!("expected RotationSchedule, got {other:?}"),
        }
    }

    #[test]
    fn test_backup_pool_drains() {
        let mut station = BaseStation::new(vec!["unit-098".to_string(), "unit-099".to_string()]);

        match station.assign_backup("delta") {
            StationEvent::BackupAssigned { agent_id, .. } => {
                assert_eq!(agent_id.as_deref(), Some("unit-099"));
            }
            other => panic!("expected BackupAssigned, got {other:?}"),
        }
        station.assign_backup("delta");

        match station.assign_backup("delta") {
            StationEvent::BackupAssigned { agent_id, .. } => assert!(agent_id.is_none()),
            other => panic!("expected BackupAssigned, got {other:?}"),
        }
        assert_eq!(station.standby_remaining(), 0);
    }

    #[test]
    fn test_envelope_event_round_trip() {
        let mut station = BaseStation::default();
        let event = station.update_envelope(MissionEnvelope {
            region: "PreCycloZone-7".to_string(),
            altitudes_m: vec![450.0, 500.0, 550.0],
        });

        let encoded = serde_json::to_string(&event).unwrap();
        assert!(encoded.contains("\"event\":\"envelope_updated\""));
        let decoded: StationEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, event);
        assert!(station.envelope().is_some());
    }
}
