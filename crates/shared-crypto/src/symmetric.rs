//! # Symmetric Encryption
//!
//! XChaCha20-Poly1305 (default) and AES-256-GCM with caller-supplied nonces.
//!
//! ## Nonce Discipline
//!
//! Callers own nonce uniqueness. [`counter_nonce`] builds nonces from a
//! per-key random prefix plus a strictly increasing counter, so a
//! `(key, nonce)` pair is never reused as long as the counter never rewinds.
//!
//! Key wrapping ([`wrap_key`] / [`unwrap_key`]) is the one place random
//! nonces are used; XChaCha20's 192-bit nonce makes collisions negligible.

use crate::CryptoError;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305,
};
use zeroize::Zeroize;

/// Length of the random per-key nonce prefix.
pub const NONCE_PREFIX_LEN: usize = 16;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Cipher selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cipher {
    /// XChaCha20-Poly1305 (default, 24-byte nonce)
    #[default]
    XChaCha20Poly1305,
    /// AES-256-GCM (12-byte nonce)
    Aes256Gcm,
}

impl Cipher {
    /// Nonce length for this cipher.
    pub fn nonce_len(self) -> usize {
        match self {
            Cipher::XChaCha20Poly1305 => 24,
            Cipher::Aes256Gcm => 12,
        }
    }
}

/// Random prefix for counter nonces.
pub fn generate_nonce_prefix() -> [u8; NONCE_PREFIX_LEN] {
    let mut prefix = [0u8; NONCE_PREFIX_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut prefix);
    prefix
}

/// Build a nonce from a per-key prefix and a monotonic counter.
///
/// XChaCha20: 16-byte prefix || 8-byte big-endian counter.
/// AES-GCM: first 4 prefix bytes || 8-byte big-endian counter.
pub fn counter_nonce(cipher: Cipher, prefix: &[u8; NONCE_PREFIX_LEN], counter: u64) -> Vec<u8> {
    let head = cipher.nonce_len() - 8;
    let mut nonce = Vec::with_capacity(cipher.nonce_len());
    nonce.extend_from_slice(&prefix[..head]);
    nonce.extend_from_slice(&counter.to_be_bytes());
    nonce
}

fn check_nonce(cipher: Cipher, nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != cipher.nonce_len() {
        return Err(CryptoError::InvalidNonceLength {
            expected: cipher.nonce_len(),
            actual: nonce.len(),
        });
    }
    Ok(())
}

/// Authenticated encryption with associated data.
///
/// # Errors
///
/// `InvalidNonceLength` for a nonce of the wrong size, `EncryptionFailed`
/// if the AEAD rejects the input.
pub fn seal(
    cipher: Cipher,
    key: &SecretKey,
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(cipher, nonce)?;
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    let result = match cipher {
        Cipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key.as_bytes().into()).encrypt(nonce.into(), payload)
        }
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into()).encrypt(nonce.into(), payload),
    };
    result.map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Inverse of [`seal`].
///
/// # Errors
///
/// `DecryptionFailed` when the tag does not authenticate (wrong key,
/// wrong nonce, wrong associated data or tampered ciphertext).
pub fn open(
    cipher: Cipher,
    key: &SecretKey,
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(cipher, nonce)?;
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    let result = match cipher {
        Cipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key.as_bytes().into()).decrypt(nonce.into(), payload)
        }
        Cipher::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into()).decrypt(nonce.into(), payload),
    };
    result.map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Wrap a data key under a master key. Output is `nonce || ciphertext`.
pub fn wrap_key(master: &SecretKey, key: &SecretKey, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; 24];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);
    let sealed = seal(Cipher::XChaCha20Poly1305, master, &nonce, key.as_bytes(), aad)?;
    let mut out = Vec::with_capacity(nonce.len() + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Recover a data key produced by [`wrap_key`].
pub fn unwrap_key(master: &SecretKey, wrapped: &[u8], aad: &[u8]) -> Result<SecretKey, CryptoError> {
    if wrapped.len() < 24 {
        return Err(CryptoError::DecryptionFailed("wrapped key too short".into()));
    }
    let (nonce, sealed) = wrapped.split_at(24);
    let mut raw = open(Cipher::XChaCha20Poly1305, master, nonce, sealed, aad)?;
    let key = SecretKey::from_slice(&raw);
    raw.zeroize();
    key
}
