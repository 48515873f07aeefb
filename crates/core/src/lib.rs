//! Core functionality for the AetherNet simulation kernel.
//!
//! This crate provides the shared error types, configuration, logging
//! initialization, and geographic/time primitives used across the
//! AetherNet workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    Config, CoordinationConfig, FeedbackConfig, NodeConfig, RosterConfig, ScoringConfig,
    SyncConfig,
};
pub use error::{CoreError, Result};
pub use types::{current_timestamp_ms, DistanceMetric, GeoPoint, TimestampMs};
