//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name stamped on every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to stdout at all
    pub console_output: bool,

    /// JSON formatted logs (for log shippers)
    pub json_logs: bool,

    /// Network identifier (testnet, mainnet, devnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "lucid-node".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "testnet".to_string(),
        }
    }
}

fn flag(var: &str, default: bool) -> bool {
    env::var(var)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LUCID_SERVICE_NAME`: Service name (default: lucid-node)
    /// - `LUCID_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `LUCID_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `LUCID_JSON_LOGS`: JSON logs (default: false in dev, true in containers)
    /// - `LUCID_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        let defaults = Self::default();

        Self {
            service_name: env::var("LUCID_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: env::var("LUCID_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: flag("LUCID_CONSOLE_OUTPUT", true),
            json_logs: flag("LUCID_JSON_LOGS", is_container),
            network: env::var("LUCID_NETWORK").unwrap_or(defaults.network),
        }
    }

    /// Service name suffixed with the network, e.g. `lucid-node-testnet`.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}
