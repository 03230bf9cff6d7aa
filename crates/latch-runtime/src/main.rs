//! # Latch Coordinator Daemon
//!
//! Initializes logging, loads configuration, wires the runtime, and runs
//! until interrupted.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use latch_runtime::{LatchConfig, LatchRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    // Load configuration
    let config = LatchConfig::from_env();
    info!(?config, "Configuration loaded");

    // Create and start the coordinator runtime
    let runtime = LatchRuntime::new(config).await;
    runtime.start().await?;

    // Keep the coordinator running
    info!("Coordinator is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
