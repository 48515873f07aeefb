//! Assignment lifecycle
//!
//! An assignment binds an agent to a target cell for a validity window.
//! It is created by the coordinator and invalidated when the agent goes
//! Offline or the target's score drops below threshold.

use aethernet_core::types::TimestampMs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, Result};

/// Assignment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentState {
    /// Assignment is live within its validity window
    Active,
    /// Invalidated before its window closed; target re-enters the pool
    Released,
    /// Window closed normally; awaiting or holding an outcome record
    Closed,
}

impl AssignmentState {
    /// Check if state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentState::Released | AssignmentState::Closed)
    }

    /// Check if transition to a new state is valid.
    pub fn can_transition_to(&self, new_state: AssignmentState) -> bool {
        match (self, new_state) {
            (AssignmentState::Active, AssignmentState::Released) => true,
            (AssignmentState::Active, AssignmentState::Closed) => true,
            _ => false,
        }
    }
}

/// An agent-to-target binding with a validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Unique assignment identifier
    pub assignment_id: Uuid,

    /// Assigned agent
    pub agent_id: String,

    /// Target cell grid key
    pub cell_id: String,

    /// Instability score of the target at assignment time
    pub score_at_assignment: f64,

    /// Current lifecycle state
    pub state: AssignmentState,

    /// Window start (Unix epoch milliseconds)
    pub valid_from: TimestampMs,

    /// Window end (Unix epoch milliseconds)
    pub valid_until: TimestampMs,

    /// Last state change timestamp
    pub updated_at: TimestampMs,
}

impl Assignment {
    /// Create a new active assignment.
    pub fn new(
        agent_id: String,
        cell_id: String,
        score_at_assignment: f64,
        valid_from: TimestampMs,
        ttl_ms: u64,
    ) -> Self {
        Self {
            assignment_id: Uuid::new_v4(),
            agent_id,
            cell_id,
            score_at_assignment,
            state: AssignmentState::Active,
            valid_from,
            valid_until: valid_from.saturating_add(ttl_ms),
            updated_at: valid_from,
        }
    }

    /// Transition to a new state, enforcing the transition table.
    pub fn transition(&mut self, new_state: AssignmentState, timestamp: TimestampMs) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(DomainError::InvalidAssignmentTransition {
                from: self.state,
                to: new_state,
            });
        }
        self.state = new_state;
        self.updated_at = timestamp;
        Ok(())
    }

    /// Release the assignment back into the pool.
    pub fn release(&mut self, timestamp: TimestampMs) -> Result<()> {
        self.transition(AssignmentState::Released, timestamp)
    }

    /// Close the assignment at the end of its window.
    pub fn close(&mut self, timestamp: TimestampMs) -> Result<()> {
        self.transition(AssignmentState::Closed, timestamp)
    }

    /// Check whether the validity window has elapsed.
    pub fn is_expired(&self, now: TimestampMs) -> bool {
        now >= self.valid_until
    }

    /// Check whether the assignment is live.
    pub fn is_active(&self) -> bool {
        self.state == AssignmentState::Active
    }
}
