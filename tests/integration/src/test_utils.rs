//! Shared helpers for integration tests.

use aethernet_core::config::Config;
use aethernet_domain::agent::{Agent, AgentRole};
use aethernet_domain::cell::CellReading;
use aethernet_engine::kernel::Kernel;

/// The example payload shape: a JSON array of cell readings.
pub const EXAMPLE_PAYLOAD: &str = r#"[
    {"lat": 44.0, "lon": -121.0, "cape": 1200.0, "vorticity": 0.0004,
     "humidity": 0.64, "timestamp": 1700000000000},
    {"lat": 45.0, "lon": -122.0, "cape": 2600.0, "vorticity": 0.0009,
     "humidity": 0.81, "timestamp": 1700000000000,
     "wind_from_deg": 135.0, "wind_shear": 6.0},
    {"lat": 46.0, "lon": -123.0, "cape": 3900.0, "vorticity": 0.0013,
     "humidity": 0.92, "timestamp": 1700000000000,
     "vertical_velocity": 2.4, "anomaly_score": 0.7}
]"#;

/// Parse the example payload.
pub fn example_readings() -> Vec<CellReading> {
    serde_json::from_str(EXAMPLE_PAYLOAD).expect("example payload parses")
}

/// Build a kernel with `fleet_size` idle operators registered at `now`.
pub fn kernel_with_fleet(node_id: &str, fleet_size: usize, now: u64, seed: u64) -> Kernel {
    let mut config = Config::default();
    config.node.node_id = node_id.to_string();

    let mut kernel = Kernel::new(config, seed);
    for i in 0..fleet_size {
        kernel.roster_mut().register(Agent::new(
            format!("{node_id}-unit-{:03}", i + 1),
            AgentRole::Operator,
            45.0 + i as f64 * 0.2,
            -122.0 - i as f64 * 0.2,
            now,
        ));
    }
    kernel
}
