//! AetherNet Sync
//!
//! Shared-state replication between simulated peers: snapshot envelopes
//! with content digests, last-write-wins merging, and broadcast
//! transports with bounded receive windows.
//!
//! Broadcast is best-effort with no delivery guarantee; a peer that hears
//! nothing within its receive window proceeds with locally known state.
//! Merges take an exclusive lock on the shared snapshot so they never
//! interleave with a tick's read.

#![warn(missing_docs)]

pub mod envelope;
pub mod error;
pub mod merge;
pub mod transport;

pub use envelope::{SnapshotEnvelope, SCHEMA_VERSION};
pub use error::{Result, SyncError};
pub use merge::{merge_snapshots, MergeSummary};
pub use transport::{LoopbackBus, PeerLink};

use aethernet_domain::snapshot::SharedStateSnapshot;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The shared snapshot guarded by an exclusive lock.
///
/// Peer merges happen outside the tick boundary; the lock keeps a merge
/// from interleaving with the next tick's snapshot read.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<SharedStateSnapshot>>,
}

impl SharedState {
    /// Wrap an initial snapshot.
    pub fn new(snapshot: SharedStateSnapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// Replace the snapshot with this tick's freshly produced one.
    pub async fn publish(&self, snapshot: SharedStateSnapshot) {
        let mut guard = self.inner.lock().await;
        *guard = snapshot;
    }

    /// Read a clone of the current snapshot.
    pub async fn read(&self) -> SharedStateSnapshot {
        self.inner.lock().await.clone()
    }

    /// Verify and merge an inbound envelope under the exclusive lock.
    pub async fn merge_envelope(&self, envelope: &SnapshotEnvelope) -> Result<MergeSummary> {
        envelope.verify_digest()?;
        let mut guard = self.inner.lock().await;
        let summary = merge_snapshots(&mut guard, &envelope.snapshot)?;
        debug!(
            origin = %envelope.node_id,
            seq = envelope.seq,
            ?summary,
            "peer envelope merged"
        );
        Ok(summary)
    }
}
