//! AetherNet simulation node
//!
//! Drives the coordination kernel on a fixed tick, broadcasts shared-state
//! snapshots to peers, and merges inbound peer state between ticks.

use aethernet_core::logging;
use aethernet_core::types::{current_timestamp_ms, GeoPoint};
use aethernet_domain::agent::{Agent, AgentRole};
use aethernet_domain::cell::CellReading;
use aethernet_domain::cluster::Cluster;
use aethernet_engine::kernel::{CancelToken, Kernel};
use aethernet_engine::station::{BaseStation, MissionEnvelope};
use aethernet_sync::{LoopbackBus, PeerLink, SharedState, SnapshotEnvelope, SyncError};
use anyhow::Context;
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, warn};

mod config;

use config::NodeOptions;

/// Cycles between station rotation plans.
const ROTATION_PLAN_EVERY: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let opts = NodeOptions::load()?;
    let readings = load_payload(&opts)?;
    info!(
        node_id = %opts.config.node.node_id,
        cells = readings.len(),
        started = %Utc::now().to_rfc3339(),
        "aethernet-node starting"
    );

    let now = current_timestamp_ms();
    let mut kernel = Kernel::new(opts.config.clone(), opts.simulator_seed);
    let mut cluster = seed_fleet(&mut kernel, &readings, opts.fleet_size, now);
    let mut station = BaseStation::new(standby_pool(opts.fleet_size));

    if let Ok(region) = std::env::var("AETHERNET_REGION") {
        let event = station.update_envelope(MissionEnvelope {
            region,
            altitudes_m: vec![450.0, 500.0, 550.0],
        });
        log_station_event(&event)?;
    }

    let mut link = match &opts.bind_addr {
        Some(bind) => PeerLink::udp(bind, opts.peers.clone())
            .await
            .context("binding udp link")?,
        None => LoopbackBus::default().join(),
    };

    let shared = SharedState::new(kernel.snapshot(now)?);
    let cancel = CancelToken::new();
    spawn_shutdown_handler(cancel.clone());

    let mut interval =
        tokio::time::interval(Duration::from_millis(opts.config.node.tick_interval_ms));
    loop {
        interval.tick().await;
        if cancel.is_cancelled() {
            break;
        }
        let now = current_timestamp_ms();

        // The simulated fleet reports in each tick; agents the simulation
        // has marked offline stay silent until they recover
        drive_heartbeats(&mut kernel, now);

        let report = kernel.run_cycle(&readings, &cancel, now).await?;
        if report.cancelled {
            info!(seq = report.seq, "cycle aborted by shutdown signal");
            break;
        }

        // Failure recovery: compact the cluster and pull in a backup when
        // membership drops below mesh strength
        if !report.timeouts.is_empty() {
            let offline = kernel.roster().offline_ids();
            let dropped = cluster.compact_failures(|id| offline.iter().any(|o| o.as_str() == id));
            if dropped > 0 {
                warn!(dropped, mode = ?cluster.mode, "cluster compacted after failures");
                let event = station.assign_backup(&cluster.cluster_id);
                log_station_event(&event)?;
            }
        }

        if report.seq % ROTATION_PLAN_EVERY == 0 {
            let event = station.rotation_plan(kernel.roster());
            log_station_event(&event)?;
        }

        // Publish and broadcast this tick's snapshot
        let snapshot = kernel.snapshot(now)?;
        shared.publish(snapshot.clone()).await;
        let envelope = SnapshotEnvelope::new(snapshot, now)?;
        link.broadcast(&envelope.encode()?).await?;

        // Drain inbound peer envelopes within the bounded window, then
        // proceed with whatever state we hold
        drain_inbound(&mut link, &shared, &opts, now).await;
        let merged = shared.read().await;
        let absorbed = kernel.absorb_peer_outcomes(&merged);
        if absorbed > 0 {
            info!(absorbed, "peer outcome records absorbed");
        }

        if opts.max_cycles > 0 && report.seq >= opts.max_cycles {
            info!(cycles = report.seq, "cycle limit reached");
            break;
        }
    }

    info!("aethernet-node shut down");
    Ok(())
}

/// Load the per-cycle ingestion payload.
fn load_payload(opts: &NodeOptions) -> anyhow::Result<Vec<CellReading>> {
    let raw = std::fs::read_to_string(&opts.payload_path)
        .with_context(|| format!("reading payload {}", opts.payload_path.display()))?;
    let readings: Vec<CellReading> =
        serde_json::from_str(&raw).context("parsing payload as a cell reading array")?;
    Ok(readings)
}

/// Register a simulated fleet spread across the payload's area and form
/// the initial cluster.
fn seed_fleet(
    kernel: &mut Kernel,
    readings: &[CellReading],
    fleet_size: usize,
    now: u64,
) -> Cluster {
    let (center_lat, center_lon) = payload_centroid(readings);
    let roles = [
        AgentRole::Scanner,
        AgentRole::Relay,
        AgentRole::Operator,
        AgentRole::Fallback,
    ];

    let mut member_ids = Vec::with_capacity(fleet_size);
    for i in 0..fleet_size {
        let angle = (i as f64 / fleet_size.max(1) as f64) * std::f64::consts::TAU;
        let agent = Agent::new(
            format!("unit-{:03}", i + 1),
            roles[i % roles.len()],
            center_lat + 0.5 * angle.sin(),
            center_lon + 0.5 * angle.cos(),
            now,
        );
        member_ids.push(agent.agent_id.clone());
        kernel.roster_mut().register(agent);
    }
    info!(fleet = fleet_size, "fleet registered");

    let cluster = Cluster::form("cluster-alpha".to_string(), member_ids);
    info!(cluster_id = %cluster.cluster_id, mode = ?cluster.mode, "cluster formed");
    cluster
}

/// Standby fallback unit ids held by the base station.
fn standby_pool(fleet_size: usize) -> Vec<String> {
    (1..=2)
        .map(|i| format!("unit-{:03}", fleet_size + i))
        .collect()
}

fn payload_centroid(readings: &[CellReading]) -> (f64, f64) {
    if readings.is_empty() {
        return (0.0, 0.0);
    }
    let n = readings.len() as f64;
    let lat = readings.iter().map(|r| r.lat).sum::<f64>() / n;
    let lon = readings.iter().map(|r| r.lon).sum::<f64>() / n;
    (lat, lon)
}

/// Simulated heartbeat traffic: every live agent reports its position.
fn drive_heartbeats(kernel: &mut Kernel, now: u64) {
    let live_ids: Vec<(String, GeoPoint)> = kernel
        .roster()
        .agents()
        .filter(|a| a.status != aethernet_domain::agent::AgentStatus::Offline)
        .map(|a| (a.agent_id.clone(), a.position()))
        .collect();
    for (agent_id, position) in live_ids {
        if let Err(err) = kernel.roster_mut().heartbeat(&agent_id, position, now) {
            warn!(%agent_id, %err, "heartbeat rejected");
        }
    }
}

/// Receive and merge peer envelopes until the window closes.
async fn drain_inbound(link: &mut PeerLink, shared: &SharedState, opts: &NodeOptions, now: u64) {
    loop {
        let bytes = match link.recv(opts.config.sync.recv_timeout_ms).await {
            Ok(bytes) => bytes,
            Err(SyncError::Timeout { .. }) => break,
            Err(err) => {
                warn!(%err, "receive failed; proceeding with local state");
                break;
            }
        };

        let envelope = match SnapshotEnvelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%err, "undecodable peer envelope dropped");
                continue;
            }
        };
        if envelope.node_id == opts.config.node.node_id {
            continue; // our own echo on the loopback bus
        }
        if let Err(err) = envelope.check_freshness(now, opts.config.sync.max_envelope_age_ms) {
            warn!(%err, "stale peer envelope dropped");
            continue;
        }

        match shared.merge_envelope(&envelope).await {
            Ok(summary) => {
                info!(
                    origin = %envelope.node_id,
                    updated = summary.total_updated(),
                    ignored = summary.ignored,
                    "peer snapshot merged"
                );
            }
            // Contradictory concurrent state is surfaced, not auto-resolved
            Err(SyncError::MergeConflict { entity, id }) => {
                error!(entity, %id, origin = %envelope.node_id, "merge conflict requires manual resolution");
            }
            Err(err) => warn!(%err, "merge failed"),
        }
    }
}

fn log_station_event(event: &aethernet_engine::station::StationEvent) -> anyhow::Result<()> {
    info!(event = %serde_json::to_string(event)?, "station event");
    Ok(())
}

/// Cancel the in-flight cycle on ctrl-c.
fn spawn_shutdown_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel.cancel();
        }
    });
}
