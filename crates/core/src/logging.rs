//! Structured logging infrastructure for AetherNet.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use aethernet_core::logging;
///
/// logging::init();
/// tracing::info!("Simulation node started");
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize the logging system with JSON output for headless runs.
///
/// This format is suitable for log aggregation and post-run analysis of
/// long simulation campaigns. Log level can be configured via the
/// `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// use aethernet_core::logging;
///
/// logging::init_json();
/// tracing::info!(node = "node-001", "Cycle complete");
/// ```
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true))
        .init();
}
