//! Cluster lifecycle
//!
//! Clusters group agents working a shared zone. A cluster with four or
//! more members operates in mesh mode; smaller clusters fall back to
//! scan mode. Failure compaction drops offline members and recomputes
//! the mode.

use serde::{Deserialize, Serialize};

/// Cluster operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    /// Coordinated mesh over the zone; requires at least four members
    Mesh,
    /// Independent scanning sweeps
    Scan,
}

/// Formation axis for the cluster's geometry block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationAxis {
    /// Leading edge of the formation
    Front,
    /// Trailing edge
    Rear,
    /// Left side
    Port,
    /// Right side
    Starboard,
    /// Stacked vertically
    Vertical,
    /// Perpendicular to the wind
    Crosswind,
}

/// Formation metadata carried by a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Formation {
    /// Yaw offset applied across the formation, degrees
    pub yaw_offset_deg: f64,
    /// Alignment axis
    pub axis: FormationAxis,
}

impl Default for Formation {
    fn default() -> Self {
        Self {
            yaw_offset_deg: 0.0,
            axis: FormationAxis::Crosswind,
        }
    }
}

/// Minimum membership for mesh mode.
const MESH_MODE_MIN_MEMBERS: usize = 4;

/// A group of agents working a shared zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique cluster identifier
    pub cluster_id: String,

    /// Member agent ids
    pub members: Vec<String>,

    /// Current operating mode
    pub mode: ClusterMode,

    /// Formation metadata
    pub formation: Formation,
}

impl Cluster {
    /// Form a cluster from a member list; mode follows membership size.
    pub fn form(cluster_id: String, members: Vec<String>) -> Self {
        let mode = Self::mode_for(members.len());
        Self {
            cluster_id,
            members,
            mode,
            formation: Formation::default(),
        }
    }

    fn mode_for(member_count: usize) -> ClusterMode {
        if member_count >= MESH_MODE_MIN_MEMBERS {
            ClusterMode::Mesh
        } else {
            ClusterMode::Scan
        }
    }

    /// Drop failed members and recompute the operating mode.
    ///
    /// Returns the number of members removed.
    pub fn compact_failures<F>(&mut self, is_failed: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.members.len();
        self.members.retain(|id| !is_failed(id));
        self.mode = Self::mode_for(self.members.len());
        before - self.members.len()
    }

    /// Update the formation geometry.
    pub fn set_formation(&mut self, yaw_offset_deg: f64, axis: FormationAxis) {
        self.formation = Formation {
            yaw_offset_deg,
            axis,
        };
    }
}
