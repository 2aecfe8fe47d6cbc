//! Structured logging.
//!
//! One `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON formatting layer. JSON lines carry target,
//! file and line so a log shipper can index them without parsing text.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// # Errors
///
/// `TelemetryError::Config` for an unparsable filter directive,
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter {:?}: {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match (config.console_output, config.json_logs) {
        (false, _) => registry.try_init(),
        (true, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        (true, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init(),
    };
    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Log a session-scoped event with the standard fields.
///
/// ```rust,ignore
/// log_session_event!(info, "lc-01", "Chunk appended", session_id, chunk_index = 4);
/// ```
#[macro_export]
macro_rules! log_session_event {
    ($level:ident, $subsystem:expr, $msg:expr, $session_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            session_id = %$session_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a proof-scoped event with node, slot and proof type.
#[macro_export]
macro_rules! log_proof_event {
    ($level:ident, $subsystem:expr, $msg:expr, $node_id:expr, $slot:expr, $proof_type:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            node_id = %$node_id,
            slot = $slot,
            proof_type = %$proof_type,
            $($($field)*,)?
            $msg
        )
    };
}
