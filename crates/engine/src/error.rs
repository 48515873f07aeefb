//! Error types for AetherNet engine operations.

use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or incomplete cell reading; the cycle skips the cell
    #[error("Invalid cell input for {cell_id}: {reason}")]
    InvalidInput {
        /// Grid key of the offending cell
        cell_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// Heartbeat received for an unregistered agent
    #[error("Unknown agent: {agent_id}")]
    UnknownAgent {
        /// Unregistered agent id
        agent_id: String,
    },

    /// Agent missed its heartbeat window; non-fatal, drives the Offline
    /// transition
    #[error("Agent {agent_id} heartbeat timed out (last seen {last_seen})")]
    AgentTimeout {
        /// Timed-out agent id
        agent_id: String,
        /// Last heartbeat timestamp
        last_seen: u64,
    },

    /// Cycle cancelled before the coordinator commit; no partial state
    #[error("Coordination cycle cancelled before commit")]
    Cancelled,

    /// Outcome id already recorded; the outcome log is append-only
    #[error("Duplicate outcome record: {outcome_id}")]
    DuplicateOutcome {
        /// Offending outcome id
        outcome_id: String,
    },

    /// Out-of-order tick phase transition
    #[error("Invalid tick phase transition from {from:?} to {to:?}")]
    InvalidPhase {
        /// Current phase
        from: crate::kernel::TickPhase,
        /// Requested phase
        to: crate::kernel::TickPhase,
    },

    /// Domain invariant violations
    #[error("Domain error: {0}")]
    Domain(#[from] aethernet_domain::DomainError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
