//! Integration tests for the AetherNet simulation workspace
//!
//! This test suite validates:
//! - Multi-node snapshot replication over the loopback bus
//! - Full coordination cycles driven from payload-shaped JSON input
//! - Cross-crate invariants (snapshot integrity after merges)

pub mod test_utils;

#[cfg(test)]
mod full_cycle_tests;

#[cfg(test)]
mod multi_node_sync_tests;
