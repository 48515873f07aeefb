//! Node runtime options: config file plus environment overrides.

use aethernet_core::config::Config;
use anyhow::{bail, Context};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime options assembled from argv and the environment.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Simulation configuration (TOML file via `AETHERNET_CONFIG`, else defaults)
    pub config: Config,
    /// Cycle payload file: a JSON array of cell readings
    pub payload_path: PathBuf,
    /// UDP bind address; when absent the node runs standalone
    pub bind_addr: Option<String>,
    /// Peer addresses for UDP broadcast
    pub peers: Vec<SocketAddr>,
    /// Seed for the mission simulator
    pub simulator_seed: u64,
    /// Number of simulated fleet agents to register at startup
    pub fleet_size: usize,
    /// Stop after this many cycles (0 = run until interrupted)
    pub max_cycles: u64,
}

impl NodeOptions {
    /// Assemble options: `argv[1]` is the payload path; everything else
    /// comes from `AETHERNET_*` environment variables with defaults.
    pub fn load() -> anyhow::Result<Self> {
        let payload_path = match env::args().nth(1) {
            Some(path) => PathBuf::from(path),
            None => bail!("usage: aethernet-node <payload.json>"),
        };

        let config = match env::var("AETHERNET_CONFIG") {
            Ok(path) => Config::from_file(&path)
                .with_context(|| format!("loading config from {path}"))?,
            Err(_) => Config::default(),
        };

        let peers = match env::var("AETHERNET_PEERS") {
            Ok(list) => list
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().parse::<SocketAddr>())
                .collect::<Result<Vec<_>, _>>()
                .context("parsing AETHERNET_PEERS")?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            config,
            payload_path,
            bind_addr: env::var("AETHERNET_BIND").ok(),
            peers,
            simulator_seed: env::var("AETHERNET_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            fleet_size: env::var("AETHERNET_FLEET_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
            max_cycles: env::var("AETHERNET_MAX_CYCLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }
}
