//! Error types for the session pipeline
//!
//! Severity follows the pipeline's propagation policy: chunk source,
//! encryption and Merkle errors end the session in `failed`; store errors
//! surface to the caller; everything else is a caller mistake.

use shared_crypto::CryptoError;
use shared_types::{SessionId, SessionStatus, StoreError};

/// Upstream byte stream ended badly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkSourceError {
    #[error("Source closed without a stop signal after {received} bytes")]
    UnexpectedEof { received: u64 },

    #[error("Source read failed: {0}")]
    Io(String),
}

/// Chunk could not be encrypted or decrypted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    #[error("No active key for session {0}")]
    KeyMissing(SessionId),

    #[error("Key {key_id} expired at {expired_at}")]
    KeyExpired { key_id: String, expired_at: u64 },

    #[error("Unknown key id {0}")]
    UnknownKey(String),

    #[error("Cipher failure: {0}")]
    Cipher(#[from] CryptoError),

    #[error("Compression failure: {0}")]
    Compression(String),

    #[error("Stored ciphertext for chunk {chunk_id} does not match its hash")]
    IntegrityMismatch { chunk_id: String },
}

impl EncryptionError {
    /// Key-state failures that a rotation can fix.
    pub fn is_key_state(&self) -> bool {
        matches!(self, Self::KeyMissing(_) | Self::KeyExpired { .. })
    }
}

/// Merkle input is inconsistent with the session record. Needs manual audit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleBuildError {
    #[error("Leaf count mismatch: {produced} chunks produced, {recorded} recorded")]
    LeafCountMismatch { produced: u64, recorded: u64 },

    #[error("Chunk index gap: expected {expected}, found {found}")]
    IndexGap { expected: u64, found: u64 },

    #[error("Session has no chunk at index {0}")]
    UnknownChunk(u64),

    #[error("Session has no Merkle root yet")]
    NoRoot,

    #[error("Proof generation failed: {0}")]
    Proof(#[from] CryptoError),
}

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_chunk_size {0} outside {min}..={max}", min = super::config::MIN_CHUNK_SIZE, max = super::config::MAX_CHUNK_SIZE)]
    ChunkSize(usize),

    #[error("compression level {0} outside 1..=22")]
    CompressionLevel(i32),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Session-level errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session already {0}")]
    AlreadyTerminal(SessionStatus),

    #[error("Session {session_id} has no chunk {index}")]
    ChunkNotFound { session_id: SessionId, index: u64 },

    #[error("Chunk index out of order: expected {expected}, got {got}")]
    IndexOutOfOrder { expected: u64, got: u64 },

    #[error("Anchor txid for session {0} before its Merkle root")]
    AnchorBeforeRoot(SessionId),

    #[error("Pipeline already running for session {0}")]
    AlreadyRunning(SessionId),

    #[error("Concurrent session limit reached ({limit})")]
    TooManySessions { limit: usize },

    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    #[error("Blocking worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ChunkSource(#[from] ChunkSourceError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    MerkleBuild(#[from] MerkleBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] super::manifest::ManifestError),
}

/// Result type for pipeline operations
pub type SessionResult<T> = Result<T, SessionError>;
