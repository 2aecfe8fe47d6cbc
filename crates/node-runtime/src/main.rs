//! # Lucid Node
//!
//! Runs the session pipeline, the chain anchor worker and PoOT consensus in
//! one process until Ctrl+C.
//!
//! Configuration comes from `LUCID_*` environment variables; see
//! [`NodeConfig::from_env`].

use anyhow::Context;
use lucid_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("invalid node configuration")?;
    if let Err(e) = config.validate_for_production() {
        warn!("{e}");
    }
    info!(
        chain = config.chain.rpc_url.as_deref().unwrap_or("dev"),
        slot_secs = config.poot.slot_duration_secs,
        "Configuration loaded"
    );

    let mut runtime = NodeRuntime::new(config).context("failed to build subsystems")?;
    runtime.start().await.context("failed to start node")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C");

    runtime.shutdown().await;
    match lucid_telemetry::encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Final metrics snapshot"),
        Err(e) => warn!(error = %e, "Metrics snapshot failed"),
    }
    Ok(())
}
