//! Domain error types

use thiserror::Error;

/// Errors arising from domain model invariants.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An assignment references an agent absent from the same snapshot
    #[error("Assignment {assignment_id} references unknown agent {agent_id}")]
    DanglingAgentReference {
        /// Offending assignment id
        assignment_id: String,
        /// Unresolved agent id
        agent_id: String,
    },

    /// Invalid status transition for an agent
    #[error("Invalid agent status transition from {from:?} to {to:?}")]
    InvalidStatusTransition {
        /// Current status
        from: crate::agent::AgentStatus,
        /// Requested status
        to: crate::agent::AgentStatus,
    },

    /// Invalid assignment state transition
    #[error("Invalid assignment state transition from {from:?} to {to:?}")]
    InvalidAssignmentTransition {
        /// Current state
        from: crate::assignment::AssignmentState,
        /// Requested state
        to: crate::assignment::AssignmentState,
    },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
