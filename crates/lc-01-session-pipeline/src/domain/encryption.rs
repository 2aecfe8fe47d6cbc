//! # Chunk Encryption
//!
//! compress (optional) -> AEAD seal -> BLAKE3 over the ciphertext.
//!
//! The associated data binds every ciphertext to its session and index:
//! `session_id (16 bytes) || chunk_index (u64 BE)`. A chunk copied into
//! another session or position fails to open.

use super::chunker::Chunk;
use super::compression::{compress_if_smaller, ChunkCompressor};
use super::errors::EncryptionError;
use super::keyring::KeyLease;
use shared_crypto::{blake3_hash, open, seal, Cipher, SecretKey};
use shared_types::{ChunkRecord, SessionId};

/// Sealed chunk and its record.
#[derive(Debug, Clone)]
pub struct EncryptedChunk {
    pub record: ChunkRecord,
    pub ciphertext: Vec<u8>,
}

/// Associated data for a chunk.
pub fn chunk_aad(session_id: &SessionId, index: u64) -> [u8; 24] {
    let mut aad = [0u8; 24];
    aad[..16].copy_from_slice(session_id.as_bytes());
    aad[16..].copy_from_slice(&index.to_be_bytes());
    aad
}

/// Seals and opens chunks. Holds no key material of its own.
pub struct ChunkEncryptor {
    compressor: Box<dyn ChunkCompressor>,
}

impl ChunkEncryptor {
    pub fn new(compressor: Box<dyn ChunkCompressor>) -> Self {
        Self { compressor }
    }

    /// Seal one chunk under a leased key.
    pub fn encrypt(
        &self,
        session_id: &SessionId,
        chunk: &Chunk,
        lease: &KeyLease,
    ) -> Result<EncryptedChunk, EncryptionError> {
        let packed = compress_if_smaller(self.compressor.as_ref(), &chunk.data)?;
        let ciphertext = seal(
            lease.cipher,
            &lease.key,
            &lease.nonce,
            &packed.bytes,
            &chunk_aad(session_id, chunk.index),
        )?;

        let record = ChunkRecord {
            chunk_id: ChunkRecord::make_id(session_id, chunk.index),
            index: chunk.index,
            size_bytes: chunk.data.len() as u64,
            compressed_size_bytes: packed.bytes.len() as u64,
            compressed: packed.compressed,
            hash: blake3_hash(&ciphertext),
            encryption_nonce: lease.nonce.clone(),
            encryption_key_id: lease.key_id.clone(),
        };
        Ok(EncryptedChunk { record, ciphertext })
    }

    /// Verify, open and decompress a stored chunk.
    pub fn decrypt(
        &self,
        session_id: &SessionId,
        record: &ChunkRecord,
        ciphertext: &[u8],
        cipher: Cipher,
        key: &SecretKey,
    ) -> Result<Vec<u8>, EncryptionError> {
        if blake3_hash(ciphertext) != record.hash {
            return Err(EncryptionError::IntegrityMismatch {
                chunk_id: record.chunk_id.clone(),
            });
        }
        let packed = open(
            cipher,
            key,
            &record.encryption_nonce,
            ciphertext,
            &chunk_aad(session_id, record.index),
        )?;
        if record.compressed {
            self.compressor
                .decompress(&packed, record.size_bytes as usize)
        } else {
            Ok(packed)
        }
    }
}
