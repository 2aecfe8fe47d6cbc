//! # Lucid Telemetry
//!
//! Logging and metrics for the Lucid node.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus families in a node-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lucid_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LUCID_SERVICE_NAME` | `lucid-node` | Service name in logs |
//! | `LUCID_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `LUCID_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `LUCID_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `LUCID_NETWORK` | `testnet` | Network name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, ACTIVE_SESSIONS,
    ANCHOR_OUTCOMES, CHUNKS_APPENDED, MERKLE_BUILD_DURATION, PROOFS_SUBMITTED, SESSIONS_FINISHED,
    SLOTS_SETTLED, SUBSYSTEM_ERRORS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// The returned guard logs a shutdown line when dropped.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(&config)?;
    tracing::debug!(families = metrics.registered(), "Metrics registered");
    Ok(TelemetryGuard {
        _metrics: metrics,
        config,
    })
}

/// Guard that keeps telemetry active for the life of the process.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
    config: TelemetryConfig,
}

impl TelemetryGuard {
    /// Configuration telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.full_service_name(), "Shutting down telemetry");
    }
}

/// Record a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
