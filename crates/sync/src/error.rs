//! Error types for AetherNet sync operations.

use thiserror::Error;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Two records share an id and timestamp but differ in content;
    /// surfaced to the caller for manual resolution, never auto-resolved
    #[error("Merge conflict on {entity} {id}: same timestamp, different content")]
    MergeConflict {
        /// Entity kind ("agent", "assignment", "outcome")
        entity: &'static str,
        /// Conflicting record id
        id: String,
    },

    /// Bounded receive window elapsed with nothing heard
    #[error("Receive window of {window_ms} ms elapsed")]
    Timeout {
        /// Window length in milliseconds
        window_ms: u64,
    },

    /// Envelope digest does not match its payload
    #[error("Envelope digest mismatch from {node_id} (seq {seq})")]
    DigestMismatch {
        /// Claimed origin node
        node_id: String,
        /// Envelope sequence number
        seq: u64,
    },

    /// Envelope older than the staleness window
    #[error("Stale envelope from {node_id}: age {age_ms} ms")]
    StaleEnvelope {
        /// Claimed origin node
        node_id: String,
        /// Envelope age in milliseconds
        age_ms: u64,
    },

    /// Loopback bus closed (all peers dropped)
    #[error("Broadcast channel closed")]
    ChannelClosed,

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network I/O errors
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
