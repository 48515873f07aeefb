//! AetherNet Engine
//!
//! The simulation engine: instability scoring, fleet roster management,
//! target coordination, mission-outcome simulation, the feedback loop,
//! and the tick kernel that sequences one coordination cycle.
//!
//! This crate provides:
//! - Weighted instability scoring over gridded atmospheric cells
//! - Flight-geometry advice derived from wind fields (declarative only)
//! - An agent roster with heartbeat sweeps and round-robin role rotation
//! - Greedy nearest-agent target assignment with all-or-nothing commits
//! - A bounded feedback loop adjusting scoring weights from outcomes
//! - Base-station planning (rotation, backups, mission envelopes)
//! - An explicit tick phase machine with cycle-level cancellation

#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod feedback;
pub mod geometry;
pub mod kernel;
pub mod roster;
pub mod scorer;
pub mod simulate;
pub mod station;

pub use coordinator::{Coordinator, StagedMatch};
pub use error::{EngineError, Result};
pub use feedback::FeedbackLoop;
pub use geometry::{heading_from_wind, suggest_geometry, AlignmentMode, GeometryAdvice};
pub use kernel::{CancelToken, CycleReport, Kernel, TickPhase};
pub use roster::Roster;
pub use scorer::{InstabilityScore, RankedCells, ScoreWeights};
pub use simulate::{MissionSimulator, SimulatedOutcome};
pub use station::{BaseStation, MissionEnvelope, StationEvent};
