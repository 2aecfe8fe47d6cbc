//! Pipeline configuration.

use super::errors::ConfigError;
use shared_types::CipherAlgorithm;
use std::time::Duration;

/// Smallest accepted chunk size (1 KiB).
pub const MIN_CHUNK_SIZE: usize = 1024;
/// Largest accepted chunk size (100 MiB).
pub const MAX_CHUNK_SIZE: usize = 100 * 1024 * 1024;
/// Default chunk size (10 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Session pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bytes per chunk; the last chunk of a session may be shorter
    pub max_chunk_size: usize,
    /// Zstd before encryption
    pub compression_enabled: bool,
    /// Zstd level (1-22)
    pub compression_level: i32,
    /// AEAD used for new session keys
    pub cipher: CipherAlgorithm,
    /// Lifetime of a session key in seconds
    pub key_ttl_secs: u64,
    /// Sessions allowed to run a pipeline at the same time
    pub max_concurrent_sessions: usize,
    /// Deadline for every document-store and chunk-store call
    pub storage_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_CHUNK_SIZE,
            compression_enabled: true,
            compression_level: 6,
            cipher: CipherAlgorithm::XChaCha20Poly1305,
            key_ttl_secs: 24 * 60 * 60,
            max_concurrent_sessions: 64,
            storage_timeout: Duration::from_secs(5),
        }
    }
}

impl PipelineConfig {
    /// Check bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.max_chunk_size) {
            return Err(ConfigError::ChunkSize(self.max_chunk_size));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigError::CompressionLevel(self.compression_level));
        }
        if self.key_ttl_secs == 0 {
            return Err(ConfigError::Zero("key_ttl_secs"));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(ConfigError::Zero("max_concurrent_sessions"));
        }
        if self.storage_timeout.is_zero() {
            return Err(ConfigError::Zero("storage_timeout"));
        }
        Ok(())
    }

    /// Small chunks, fast compression. Keeps unit tests quick.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            max_chunk_size: MIN_CHUNK_SIZE,
            compression_level: 1,
            max_concurrent_sessions: 4,
            ..Self::default()
        }
    }
}
