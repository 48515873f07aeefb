//! Snapshot envelopes
//!
//! The wire contract for state broadcast: a versioned JSON envelope
//! carrying the snapshot plus a blake3 content digest for integrity and
//! conflict comparison.

use aethernet_core::types::TimestampMs;
use aethernet_domain::snapshot::SharedStateSnapshot;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SyncError};

/// Wire schema version for compatibility management.
pub const SCHEMA_VERSION: &str = "aethernet.sync.v1";

/// A broadcast envelope wrapping one shared-state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Schema version tag
    pub schema: String,
    /// Envelope id for deduplication
    pub envelope_id: Uuid,
    /// Originating node
    pub node_id: String,
    /// Snapshot sequence number from the origin
    pub seq: u64,
    /// Envelope creation timestamp (Unix epoch milliseconds)
    pub issued_at: TimestampMs,
    /// Hex-encoded blake3 digest of the canonical snapshot encoding
    pub digest: String,
    /// The snapshot payload
    pub snapshot: SharedStateSnapshot,
}

impl SnapshotEnvelope {
    /// Wrap a snapshot, computing its content digest.
    pub fn new(snapshot: SharedStateSnapshot, issued_at: TimestampMs) -> Result<Self> {
        let digest = content_digest(&snapshot)?;
        Ok(Self {
            schema: SCHEMA_VERSION.to_string(),
            envelope_id: Uuid::new_v4(),
            node_id: snapshot.node_id.clone(),
            seq: snapshot.seq,
            issued_at,
            digest,
            snapshot,
        })
    }

    /// Verify that the payload still matches the carried digest.
    pub fn verify_digest(&self) -> Result<()> {
        let computed = content_digest(&self.snapshot)?;
        if computed != self.digest {
            return Err(SyncError::DigestMismatch {
                node_id: self.node_id.clone(),
                seq: self.seq,
            });
        }
        Ok(())
    }

    /// Check the envelope's age against a staleness window.
    pub fn check_freshness(&self, now: TimestampMs, max_age_ms: u64) -> Result<()> {
        let age = now.saturating_sub(self.issued_at);
        if age > max_age_ms {
            return Err(SyncError::StaleEnvelope {
                node_id: self.node_id.clone(),
                age_ms: age,
            });
        }
        Ok(())
    }

    /// Encode for the wire.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Hex-encoded blake3 digest of a record's canonical JSON encoding.
///
/// Used both for envelope integrity and for content comparison during
/// merge conflict detection.
pub fn content_digest<T: Serialize>(value: &T) -> Result<String> {
    let canonical = serde_json::to_vec(value)?;
    Ok(hex::encode(blake3::hash(&canonical).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(node_id: &str, seq: u64) -> SharedStateSnapshot {
        SharedStateSnapshot::new(
            node_id.to_string(),
            seq,
            1_000,
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = SnapshotEnvelope::new(snapshot("node-001", 3), 2_000).unwrap();
        let bytes = envelope.encode().unwrap();
        let decoded = SnapshotEnvelope::decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
        assert!(decoded.verify_digest().is_ok());
        assert_eq!(decoded.schema, SCHEMA_VERSION);
    }

    #[test]
    fn test_tampered_payload_fails_digest() {
        let mut envelope = SnapshotEnvelope::new(snapshot("node-001", 3), 2_000).unwrap();
        envelope.snapshot.seq = 99;
        assert!(matches!(
            envelope.verify_digest(),
            Err(SyncError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_freshness_window() {
        let envelope = SnapshotEnvelope::new(snapshot("node-001", 3), 2_000).unwrap();
        assert!(envelope.check_freshness(10_000, 60_000).is_ok());
        assert!(matches!(
            envelope.check_freshness(100_000, 60_000),
            Err(SyncError::StaleEnvelope { .. })
        ));
    }

    #[test]
    fn test_digest_is_content_addressed() {
        let a = content_digest(&snapshot("node-001", 3)).unwrap();
        let b = content_digest(&snapshot("node-001", 3)).unwrap();
        let c = content_digest(&snapshot("node-001", 4)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
