//! Last-write-wins snapshot merging
//!
//! Merges a peer snapshot into local state per entity id using record
//! timestamps. Absence of an id in the incoming snapshot means "no new
//! information", never deletion. Two records sharing an id and timestamp
//! with different content raise a merge conflict; conflicts are detected
//! before any mutation so a failed merge leaves local state untouched.

use aethernet_domain::snapshot::SharedStateSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::envelope::content_digest;
use crate::error::{Result, SyncError};

/// Counters describing what one merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Agent records inserted or replaced
    pub agents_updated: usize,
    /// Assignment records inserted or replaced
    pub assignments_updated: usize,
    /// Outcome records inserted or replaced
    pub outcomes_updated: usize,
    /// Incoming records ignored as older or identical
    pub ignored: usize,
}

impl MergeSummary {
    /// Total records taken from the incoming snapshot.
    pub fn total_updated(&self) -> usize {
        self.agents_updated + self.assignments_updated + self.outcomes_updated
    }
}

/// Merge an incoming snapshot into local state, last write wins.
///
/// The merge is atomic: conflict detection runs over every entity map
/// first, and only a conflict-free merge mutates local state. Merging
/// the same snapshot twice yields the same result as merging it once.
pub fn merge_snapshots(
    local: &mut SharedStateSnapshot,
    incoming: &SharedStateSnapshot,
) -> Result<MergeSummary> {
    check_conflicts("agent", &local.agents, &incoming.agents, |a| a.last_seen)?;
    check_conflicts("assignment", &local.assignments, &incoming.assignments, |a| {
        a.updated_at
    })?;
    check_conflicts("outcome", &local.outcomes, &incoming.outcomes, |o| {
        o.recorded_at
    })?;

    let mut summary = MergeSummary::default();
    summary.agents_updated = apply_lww(
        &mut local.agents,
        &incoming.agents,
        |a| a.last_seen,
        &mut summary.ignored,
    );
    summary.assignments_updated = apply_lww(
        &mut local.assignments,
        &incoming.assignments,
        |a| a.updated_at,
        &mut summary.ignored,
    );
    summary.outcomes_updated = apply_lww(
        &mut local.outcomes,
        &incoming.outcomes,
        |o| o.recorded_at,
        &mut summary.ignored,
    );

    Ok(summary)
}

/// First pass: find any same-id, same-timestamp, different-content pair.
fn check_conflicts<K, V, F>(
    entity: &'static str,
    local: &BTreeMap<K, V>,
    incoming: &BTreeMap<K, V>,
    timestamp_of: F,
) -> Result<()>
where
    K: Ord + ToString,
    V: Serialize,
    F: Fn(&V) -> u64,
{
    for (id, theirs) in incoming {
        if let Some(ours) = local.get(id) {
            if timestamp_of(ours) == timestamp_of(theirs)
                && content_digest(ours)? != content_digest(theirs)?
            {
                return Err(SyncError::MergeConflict {
                    entity,
                    id: id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Second pass: take every incoming record that is strictly newer, or
/// absent locally. Older and identical-timestamp records are ignored.
fn apply_lww<K, V, F>(
    local: &mut BTreeMap<K, V>,
    incoming: &BTreeMap<K, V>,
    timestamp_of: F,
    ignored: &mut usize,
) -> usize
where
    K: Ord + Clone,
    V: Clone,
    F: Fn(&V) -> u64,
{
    let mut updated = 0;
    for (id, theirs) in incoming {
        match local.get(id) {
            Some(ours) if timestamp_of(ours) >= timestamp_of(theirs) => {
                *ignored += 1;
            }
            _ => {
                local.insert(id.clone(), theirs.clone());
                updated += 1;
            }
        }
    }
    updated
}
