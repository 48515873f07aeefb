//! Full coordination cycles driven from payload-shaped input.

use crate::test_utils::{example_readings, kernel_with_fleet};
use aethernet_engine::kernel::CancelToken;

#[tokio::test]
async fn payload_to_snapshot_pipeline() {
    let mut kernel = kernel_with_fleet("alpha", 2, 1_000, 7);
    let readings = example_readings();

    let report = kernel
        .run_cycle(&readings, &CancelToken::new(), 1_000)
        .await
        .unwrap();

    assert_eq!(report.scored, 3);
    assert_eq!(report.skipped, 0);
    // Two agents cover the two most unstable cells; the mild cell waits
    assert_eq!(report.assigned, 2);
    let cells: Vec<&str> = kernel
        .assignments()
        .values()
        .map(|a| a.cell_id.as_str())
        .collect();
    assert!(cells.contains(&"cell_46.000_-123.000"));
    assert!(cells.contains(&"cell_45.000_-122.000"));

    // The produced snapshot is internally consistent and round-trips
    let snapshot = kernel.snapshot(1_000).unwrap();
    snapshot.validate().unwrap();
    let encoded = serde_json::to_vec(&snapshot).unwrap();
    let decoded: aethernet_domain::snapshot::SharedStateSnapshot =
        serde_json::from_slice(&encoded).unwrap();
    assert_eq!(decoded, snapshot);
}

#[tokio::test]
async fn repeated_cycles_keep_state_consistent() {
    let mut kernel = kernel_with_fleet("alpha", 3, 1_000, 7);
    let readings = example_readings();

    for tick in 1..=20u64 {
        // Fleet keeps reporting in so nothing times out
        let ids: Vec<String> = kernel
            .roster()
            .agents()
            .map(|a| a.agent_id.clone())
            .collect();
        let now = 1_000 + tick * 5_000;
        for id in ids {
            let pos = kernel.roster().get(&id).unwrap().position();
            kernel.roster_mut().heartbeat(&id, pos, now).unwrap();
        }

        let report = kernel
            .run_cycle(&readings, &CancelToken::new(), now)
            .await
            .unwrap();
        assert!(!report.cancelled);
        assert!(report.timeouts.is_empty());

        let snapshot = kernel.snapshot(now).unwrap();
        snapshot.validate().unwrap();

        // Weights never drift out of their configured bounds
        assert!(kernel.weights().within_bounds(0.05, 0.60));

        // No agent ever holds two live assignments
        let mut holders: Vec<&str> = kernel
            .assignments()
            .values()
            .filter(|a| a.is_active())
            .map(|a| a.agent_id.as_str())
            .collect();
        holders.sort_unstable();
        let before = holders.len();
        holders.dedup();
        assert_eq!(before, holders.len());
    }
}
