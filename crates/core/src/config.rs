//! Configuration management for the AetherNet simulation kernel.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::types::DistanceMetric;

/// Top-level simulation configuration.
///
/// Loaded from TOML at startup; every section carries illustrative defaults
/// so a node can run without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub scoring: ScoringConfig,
    pub roster: RosterConfig,
    pub coordination: CoordinationConfig,
    pub feedback: FeedbackConfig,
    pub sync: SyncConfig,
}

/// Node identity and tick cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node identifier used in snapshot envelopes
    pub node_id: String,
    /// Coordination cycle interval in milliseconds
    pub tick_interval_ms: u64,
}

/// Instability scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of top-scored cells handed to the coordinator each cycle
    pub top_k: usize,
    /// Minimum score for a cell to merit increased modeling focus
    pub focus_threshold: f64,
    /// Lower bound for any feedback-adjusted feature weight
    pub weight_floor: f64,
    /// Upper bound for any feedback-adjusted feature weight
    pub weight_ceiling: f64,
}

/// Agent roster parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Heartbeat timeout in milliseconds; agents past this go Offline
    pub heartbeat_timeout_ms: u64,
    /// Interval between round-robin role rotations in milliseconds
    pub rotation_interval_ms: u64,
    /// Wear accrued per cycle by non-idle agents (0.0 to 1.0 scale)
    pub wear_per_cycle: f64,
    /// Wear recovered per cycle by idle agents
    pub wear_recovery_per_cycle: f64,
}

/// Coordinator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Distance metric for agent-to-cell matching
    pub distance_metric: DistanceMetric,
    /// Assignment validity window in milliseconds
    pub assignment_ttl_ms: u64,
    /// Assignments whose target score falls below this are released
    pub release_threshold: f64,
}

/// Feedback loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// EMA learning rate for weight updates
    pub learning_rate: f64,
    /// Number of recent outcome records carried in snapshots
    pub recent_outcome_window: usize,
}

/// Sync layer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bounded receive window per cycle in milliseconds
    pub recv_timeout_ms: u64,
    /// Envelopes older than this are dropped without merging
    pub max_envelope_age_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-001".to_string(),
            tick_interval_ms: 30_000,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            focus_threshold: 0.65,
            weight_floor: 0.05,
            weight_ceiling: 0.60,
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 60_000,
            rotation_interval_ms: 300_000,
            wear_per_cycle: 0.02,
            wear_recovery_per_cycle: 0.01,
        }
    }
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            distance_metric: DistanceMetric::EuclideanDegrees,
            assignment_ttl_ms: 120_000,
            release_threshold: 0.2,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            recent_outcome_window: 32,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            recv_timeout_ms: 250,
            max_envelope_age_ms: 60_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            scoring: ScoringConfig::default(),
            roster: RosterConfig::default(),
            coordination: CoordinationConfig::default(),
            feedback: FeedbackConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.roster.heartbeat_timeout_ms, 60_000);
        assert_eq!(config.scoring.top_k, 3);
        assert!((config.scoring.focus_threshold - 0.65).abs() < f64::EPSILON);
        assert!(config.scoring.weight_floor < config.scoring.weight_ceiling);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            [node]
            node_id = "node-042"
            tick_interval_ms = 5000

            [roster]
            heartbeat_timeout_ms = 10000
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.node.node_id, "node-042");
        assert_eq!(config.node.tick_interval_ms, 5000);
        assert_eq!(config.roster.heartbeat_timeout_ms, 10_000);
        // Untouched sections keep defaults
        assert_eq!(config.scoring.top_k, 3);
    }

    #[test]
    fn test_parse_distance_metric() {
        let toml = r#"
            [coordination]
            distance_metric = "haversine_km"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(
            config.coordination.distance_metric,
            DistanceMetric::HaversineKm
        );
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_toml("node = 3").is_err());
    }
}
