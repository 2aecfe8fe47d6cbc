//! # Node Configuration
//!
//! Unified configuration for all subsystems, overlaid from `LUCID_*`
//! environment variables.
//!
//! ## Security Requirements
//!
//! - `master_key` wraps every session key at rest. Without one the node
//!   generates an ephemeral key and stored chunks die with the process.
//! - A chain RPC endpoint needs an anchor contract address.

use lc_01_session_pipeline::domain::ConfigError as PipelineConfigError;
use lc_01_session_pipeline::PipelineConfig;
use lc_02_chain_anchor::{AnchorConfig, AnchorConfigError};
use lc_03_poot_consensus::{PootConfig, PootConfigError};
use shared_types::CipherAlgorithm;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub pipeline: PipelineConfig,
    pub anchor: AnchorConfig,
    pub poot: PootConfig,
    pub chain: ChainConfig,
    pub security: SecurityConfig,
    pub runtime: RuntimeConfig,
}

/// Chain endpoint.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint. `None` runs the in-process dev chain.
    pub rpc_url: Option<String>,
    /// Anchor contract address (0x-prefixed hex).
    pub contract_address: Option<String>,
    /// Depth the dev chain reports for every transaction.
    pub dev_confirmations: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: None,
            dev_confirmations: 12,
        }
    }
}

#[derive(Clone, Default)]
pub struct SecurityConfig {
    /// 32-byte key wrapping session keys at rest.
    pub master_key: Option<[u8; 32]>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("master_key", &self.master_key.map(|_| "<redacted>"))
            .finish()
    }
}

/// Runtime plumbing.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Broadcast buffer of the node-wide event bus.
    pub event_bus_capacity: usize,
    /// Time background tasks get to stop after shutdown is signalled.
    pub shutdown_grace: Duration,
    /// Period of the expired-key purge.
    pub key_maintenance_period: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 1024,
            shutdown_grace: Duration::from_secs(2),
            key_maintenance_period: Duration::from_secs(60),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid pipeline configuration: {0}")]
    Pipeline(#[from] PipelineConfigError),

    #[error("Invalid anchor configuration: {0}")]
    Anchor(#[from] AnchorConfigError),

    #[error("Invalid PoOT configuration: {0}")]
    Poot(#[from] PootConfigError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("LUCID_CHAIN_RPC_URL is set but LUCID_ANCHOR_CONTRACT is not")]
    MissingContract,

    #[error(
        "SECURITY VIOLATION: no master key. Set LUCID_MASTER_KEY (64 hex chars) \
         or stored chunks cannot be decrypted after a restart."
    )]
    MissingMasterKey,
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVar {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidVar {
                var,
                value,
                reason: "expected true or false".into(),
            }),
        },
    }
}

fn parse_cipher(value: &str) -> Option<CipherAlgorithm> {
    match value.to_lowercase().as_str() {
        "xchacha20-poly1305" | "xchacha20" => Some(CipherAlgorithm::XChaCha20Poly1305),
        "aes-256-gcm" | "aes" => Some(CipherAlgorithm::Aes256Gcm),
        _ => None,
    }
}

fn parse_master_key(value: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(value.trim().trim_start_matches("0x")).map_err(|e| e.to_string())?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
}

impl NodeConfig {
    /// Defaults overlaid with `LUCID_*` environment variables, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns, validated.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let lookup = &lookup;

        // Session pipeline
        if let Some(v) = parse_var(lookup, "LUCID_MAX_CHUNK_SIZE")? {
            config.pipeline.max_chunk_size = v;
        }
        if let Some(v) = parse_flag(lookup, "LUCID_COMPRESSION")? {
            config.pipeline.compression_enabled = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_COMPRESSION_LEVEL")? {
            config.pipeline.compression_level = v;
        }
        if let Some(value) = lookup("LUCID_CIPHER") {
            config.pipeline.cipher =
                parse_cipher(&value).ok_or_else(|| ConfigError::InvalidVar {
                    var: "LUCID_CIPHER",
                    value,
                    reason: "expected xchacha20-poly1305 or aes-256-gcm".into(),
                })?;
        }
        if let Some(v) = parse_var(lookup, "LUCID_KEY_TTL_SECS")? {
            config.pipeline.key_ttl_secs = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_MAX_SESSIONS")? {
            config.pipeline.max_concurrent_sessions = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_STORAGE_TIMEOUT_SECS")? {
            config.pipeline.storage_timeout = Duration::from_secs(v);
            config.poot.store_timeout = Duration::from_secs(v);
        }

        // Chain anchor
        if let Some(v) = parse_var(lookup, "LUCID_ANCHOR_MAX_ATTEMPTS")? {
            config.anchor.max_attempts = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_ANCHOR_RPC_TIMEOUT_SECS")? {
            config.anchor.rpc_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(lookup, "LUCID_ANCHOR_CONFIRMATIONS")? {
            config.anchor.confirmation_threshold = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_ANCHOR_POLL_SECS")? {
            config.anchor.poll_interval = Duration::from_secs(v);
        }
        config.chain.rpc_url = lookup("LUCID_CHAIN_RPC_URL").filter(|v| !v.is_empty());
        config.chain.contract_address = lookup("LUCID_ANCHOR_CONTRACT").filter(|v| !v.is_empty());

        // PoOT
        if let Some(v) = parse_var(lookup, "LUCID_SLOT_SECS")? {
            config.poot.slot_duration_secs = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_GENESIS_TIME")? {
            config.poot.genesis_time = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_SLOT_REWARD_POOL")? {
            config.poot.slot_reward_pool = v;
        }
        if let Some(v) = parse_var(lookup, "LUCID_BEACON_WINDOW_SECS")? {
            config.poot.beacon_window_secs = v;
        }

        // Runtime
        if let Some(v) = parse_var(lookup, "LUCID_EVENT_BUS_CAPACITY")? {
            config.runtime.event_bus_capacity = v;
        }

        // Security
        if let Some(value) = lookup("LUCID_MASTER_KEY") {
            let key = parse_master_key(&value).map_err(|reason| ConfigError::InvalidVar {
                var: "LUCID_MASTER_KEY",
                value: "<redacted>".into(),
                reason,
            })?;
            config.security.master_key = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every subsystem config plus the cross-cutting rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.anchor.validate()?;
        self.poot.validate()?;
        if self.runtime.event_bus_capacity == 0 {
            return Err(ConfigError::Zero("event_bus_capacity"));
        }
        if self.runtime.key_maintenance_period.is_zero() {
            return Err(ConfigError::Zero("key_maintenance_period"));
        }
        if self.chain.rpc_url.is_some() && self.chain.contract_address.is_none() {
            return Err(ConfigError::MissingContract);
        }
        Ok(())
    }

    /// Stricter checks for a node that keeps data across restarts.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.security.master_key.is_none() {
            return Err(ConfigError::MissingMasterKey);
        }
        Ok(())
    }
}
