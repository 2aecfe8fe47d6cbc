//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption or authentication failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid nonce length
    #[error("Invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected nonce length in bytes
        expected: usize,
        /// Actual nonce length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signature bytes are not 64 bytes long
    #[error("Invalid signature length: {0}")]
    InvalidSignatureLength(usize),

    /// Public key is not a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Merkle proof requested for a leaf that does not exist
    #[error("Leaf index {index} out of range for {leaf_count} leaves")]
    LeafIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of leaves in the tree
        leaf_count: usize,
    },
}
