//! # BLAKE3 Hashing
//!
//! Content addressing for chunks, Merkle pair hashing and domain-separated
//! digests for signed messages.

use blake3::Hasher;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful BLAKE3 hasher.
pub struct Blake3Hasher {
    inner: Hasher,
}

impl Blake3Hasher {
    /// Plain hasher.
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    /// Hasher bound to a domain context string. Digests from different
    /// domains never collide even over identical input.
    pub fn with_domain(context: &str) -> Self {
        Self {
            inner: Hasher::new_derive_key(context),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Length-prefixed update, so adjacent variable-length fields cannot
    /// be re-split into a different message with the same digest.
    pub fn update_framed(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(&(data.len() as u64).to_be_bytes());
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash the concatenation of several inputs.
pub fn blake3_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Blake3Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}

/// Derive a 32-byte key from context and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_many_matches_concatenation() {
        let joined = blake3_hash(b"leftright");
        assert_eq!(blake3_hash_many(&[&b"left"[..], &b"right"[..]]), joined);
    }

    #[test]
    fn test_domain_separation() {
        let mut a = Blake3Hasher::with_domain("lucid proof v1");
        let mut b = Blake3Hasher::with_domain("lucid beacon v1");
        a.update(b"payload");
        b.update(b"payload");
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_framed_update_resists_resplitting() {
        let mut a = Blake3Hasher::new();
        a.update_framed(b"ab").update_framed(b"c");
        let mut b = Blake3Hasher::new();
        b.update_framed(b"a").update_framed(b"bc");
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_derive_key_is_stable() {
        let k1 = blake3_derive_key("lucid key wrap", b"master secret");
        let k2 = blake3_derive_key("lucid key wrap", b"master secret");
        assert_eq!(k1, k2);
        assert_ne!(k1, blake3_derive_key("lucid other", b"master secret"));
    }
}
