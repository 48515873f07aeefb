//! Multi-node replication over the loopback bus.

use crate::test_utils::{example_readings, kernel_with_fleet};
use aethernet_engine::kernel::CancelToken;
use aethernet_sync::{LoopbackBus, SharedState, SnapshotEnvelope, SyncError};

#[tokio::test]
async fn two_nodes_converge_through_broadcast() {
    let bus = LoopbackBus::default();
    let alpha_link = bus.join();
    let mut beta_link = bus.join();

    let mut alpha = kernel_with_fleet("alpha", 2, 1_000, 11);
    let mut beta = kernel_with_fleet("beta", 2, 1_000, 22);
    let readings = example_readings();

    alpha
        .run_cycle(&readings, &CancelToken::new(), 1_000)
        .await
        .unwrap();
    beta.run_cycle(&readings, &CancelToken::new(), 1_000)
        .await
        .unwrap();

    // Alpha broadcasts its snapshot; beta merges it
    let alpha_snapshot = alpha.snapshot(2_000).unwrap();
    let envelope = SnapshotEnvelope::new(alpha_snapshot.clone(), 2_000).unwrap();
    alpha_link
        .broadcast(&envelope.encode().unwrap())
        .await
        .unwrap();

    let beta_state = SharedState::new(beta.snapshot(2_000).unwrap());
    let bytes = beta_link.recv(500).await.unwrap();
    let received = SnapshotEnvelope::decode(&bytes).unwrap();
    received.verify_digest().unwrap();

    let summary = beta_state.merge_envelope(&received).await.unwrap();
    // Alpha's agents and assignments are news to beta
    assert!(summary.total_updated() > 0);

    let merged = beta_state.read().await;
    // Both fleets now coexist; merged assignments still resolve their agents
    assert!(merged.agents.contains_key("alpha-unit-001"));
    assert!(merged.agents.contains_key("beta-unit-001"));
    merged.validate().unwrap();

    // Beta absorbs nothing it already has on a repeat merge
    let repeat = beta_state.merge_envelope(&received).await.unwrap();
    assert_eq!(repeat.total_updated(), 0);
}

#[tokio::test]
async fn receive_window_elapses_without_peers() {
    let bus = LoopbackBus::default();
    let mut lonely = bus.join();

    // Nothing on the bus: the bounded window elapses and the node is
    // expected to proceed with local state
    let result = lonely.recv(25).await;
    assert!(matches!(result, Err(SyncError::Timeout { .. })));
}

#[tokio::test]
async fn peer_outcomes_flow_into_the_local_log() {
    let mut alpha = kernel_with_fleet("alpha", 1, 1_000, 11);
    let mut beta = kernel_with_fleet("beta", 1, 1_000, 22);
    let readings = example_readings();

    // Alpha closes an assignment window to produce an outcome record
    alpha
        .run_cycle(&readings, &CancelToken::new(), 1_000)
        .await
        .unwrap();
    // Heartbeat so the agent survives to the closing cycle
    let ids: Vec<String> = alpha.roster().agents().map(|a| a.agent_id.clone()).collect();
    for id in &ids {
        let pos = alpha.roster().get(id).unwrap().position();
        alpha.roster_mut().heartbeat(id, pos, 125_000).unwrap();
    }
    let report = alpha
        .run_cycle(&readings, &CancelToken::new(), 125_000)
        .await
        .unwrap();
    assert_eq!(report.closed, 1);

    let alpha_snapshot = alpha.snapshot(126_000).unwrap();
    assert_eq!(alpha_snapshot.outcomes.len(), 1);

    let absorbed = beta.absorb_peer_outcomes(&alpha_snapshot);
    assert_eq!(absorbed, 1);
    // Absorbing the same snapshot again is a no-op; history never rewrites
    assert_eq!(beta.absorb_peer_outcomes(&alpha_snapshot), 0);
}
