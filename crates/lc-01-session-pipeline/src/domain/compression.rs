//! # Chunk Compression
//!
//! Zstd compression applied to each chunk before encryption.
//!
//! A chunk that does not shrink is stored raw and flagged as such in its
//! `ChunkRecord`, so incompressible media never pays for a larger payload.

use super::errors::EncryptionError;

/// Compression settings.
#[derive(Debug, Clone, Copy)]
pub struct CompressionConfig {
    /// Zstd level (1-22)
    pub level: i32,
    /// Disable to store every chunk raw
    pub enabled: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 6,
            enabled: true,
        }
    }
}

/// Chunk compressor.
pub trait ChunkCompressor: Send + Sync {
    /// Compress `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError>;

    /// Decompress into at most `original_len` bytes.
    fn decompress(&self, data: &[u8], original_len: usize) -> Result<Vec<u8>, EncryptionError>;

    fn is_enabled(&self) -> bool;
}

/// Result of [`compress_if_smaller`].
#[derive(Debug, PartialEq, Eq)]
pub struct Packed {
    pub bytes: Vec<u8>,
    pub compressed: bool,
}

/// Compress and keep the output only when it is strictly smaller.
pub fn compress_if_smaller(
    compressor: &dyn ChunkCompressor,
    data: &[u8],
) -> Result<Packed, EncryptionError> {
    if compressor.is_enabled() {
        let packed = compressor.compress(data)?;
        if packed.len() < data.len() {
            return Ok(Packed {
                bytes: packed,
                compressed: true,
            });
        }
    }
    Ok(Packed {
        bytes: data.to_vec(),
        compressed: false,
    })
}

/// Zstd single-frame compressor.
pub struct ZstdCompressor {
    config: CompressionConfig,
}

impl ZstdCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }
}

impl ChunkCompressor for ZstdCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        zstd::bulk::compress(data, self.config.level)
            .map_err(|e| EncryptionError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8], original_len: usize) -> Result<Vec<u8>, EncryptionError> {
        let out = zstd::bulk::decompress(data, original_len)
            .map_err(|e| EncryptionError::Compression(e.to_string()))?;
        if out.len() != original_len {
            return Err(EncryptionError::Compression(format!(
                "decompressed {} bytes, expected {}",
                out.len(),
                original_len
            )));
        }
        Ok(out)
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}
