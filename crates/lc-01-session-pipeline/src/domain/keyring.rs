//! # Session Keyring
//!
//! Owns every data-encryption key the node has issued. Keys live in an
//! arena indexed by key id; each session points at exactly one active key.
//!
//! ## Invariants
//!
//! - A session has at most one active key at any time.
//! - Rotation replaces the active key; the previous key stays resolvable by
//!   id until it expires, so chunks sealed under it remain decryptable.
//! - Key material is held wrapped under the node master key and unwrapped
//!   only for the duration of one seal or open.
//! - Nonces are `prefix || counter` per key and the counter never rewinds.

use super::errors::EncryptionError;
use serde::{Deserialize, Serialize};
use shared_crypto::symmetric::{counter_nonce, generate_nonce_prefix, unwrap_key, wrap_key};
use shared_crypto::{Cipher, SecretKey};
use shared_types::{CipherAlgorithm, SessionId};
use std::collections::HashMap;
use tracing::{debug, info};

/// Persisted key document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyRecord {
    #[serde(rename = "_id")]
    pub key_id: String,
    pub session_id: SessionId,
    pub algorithm: CipherAlgorithm,
    /// Key material wrapped under the master key.
    pub key_data: Vec<u8>,
    pub created_at: u64,
    pub expires_at: u64,
    pub rotation_count: u32,
}

impl EncryptionKeyRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Map the persisted algorithm name to the cipher implementation.
pub fn cipher_for(algorithm: CipherAlgorithm) -> Cipher {
    match algorithm {
        CipherAlgorithm::XChaCha20Poly1305 => Cipher::XChaCha20Poly1305,
        CipherAlgorithm::Aes256Gcm => Cipher::Aes256Gcm,
    }
}

/// Unwrapped key plus a fresh nonce, valid for exactly one seal.
#[derive(Debug)]
pub struct KeyLease {
    pub key_id: String,
    pub cipher: Cipher,
    pub key: SecretKey,
    pub nonce: Vec<u8>,
}

struct KeyEntry {
    record: EncryptionKeyRecord,
    nonce_prefix: [u8; shared_crypto::symmetric::NONCE_PREFIX_LEN],
    next_counter: u64,
}

/// Arena of session keys.
pub struct KeyRing {
    master: SecretKey,
    algorithm: CipherAlgorithm,
    ttl_secs: u64,
    arena: Vec<Option<KeyEntry>>,
    by_id: HashMap<String, usize>,
    active: HashMap<SessionId, usize>,
}

fn wrap_aad(session_id: &SessionId, key_id: &str) -> Vec<u8> {
    let mut aad = session_id.as_bytes().to_vec();
    aad.extend_from_slice(key_id.as_bytes());
    aad
}

impl KeyRing {
    pub fn new(master: SecretKey, algorithm: CipherAlgorithm, ttl_secs: u64) -> Self {
        Self {
            master,
            algorithm,
            ttl_secs,
            arena: Vec::new(),
            by_id: HashMap::new(),
            active: HashMap::new(),
        }
    }

    /// Issue the first key for a session.
    pub fn create_session_key(
        &mut self,
        session_id: SessionId,
        now: u64,
    ) -> Result<EncryptionKeyRecord, EncryptionError> {
        self.issue(session_id, now)
    }

    /// Replace the session's active key with a new one.
    pub fn rotate(
        &mut self,
        session_id: SessionId,
        now: u64,
    ) -> Result<EncryptionKeyRecord, EncryptionError> {
        let record = self.issue(session_id, now)?;
        info!(
            session_id = %session_id,
            key_id = %record.key_id,
            rotation_count = record.rotation_count,
            "Session key rotated"
        );
        Ok(record)
    }

    fn issue(
        &mut self,
        session_id: SessionId,
        now: u64,
    ) -> Result<EncryptionKeyRecord, EncryptionError> {
        let rotation_count = self
            .active
            .get(&session_id)
            .and_then(|&slot| self.arena[slot].as_ref())
            .map_or(0, |entry| entry.record.rotation_count + 1);

        let key_id = format!("key-{}", uuid::Uuid::new_v4().simple());
        let key = SecretKey::generate();
        let key_data = wrap_key(&self.master, &key, &wrap_aad(&session_id, &key_id))?;
        let record = EncryptionKeyRecord {
            key_id: key_id.clone(),
            session_id,
            algorithm: self.algorithm,
            key_data,
            created_at: now,
            expires_at: now.saturating_add(self.ttl_secs),
            rotation_count,
        };

        let slot = self.insert(record.clone());
        self.active.insert(session_id, slot);
        debug!(session_id = %session_id, key_id = %key_id, "Session key issued");
        Ok(record)
    }

    fn insert(&mut self, record: EncryptionKeyRecord) -> usize {
        let slot = self.arena.len();
        self.by_id.insert(record.key_id.clone(), slot);
        self.arena.push(Some(KeyEntry {
            record,
            nonce_prefix: generate_nonce_prefix(),
            next_counter: 0,
        }));
        slot
    }

    /// Re-register a persisted key for decryption. It never becomes active.
    pub fn restore(&mut self, record: EncryptionKeyRecord) {
        if !self.by_id.contains_key(&record.key_id) {
            self.insert(record);
        }
    }

    /// Unwrap the active key and reserve the next nonce.
    pub fn lease(&mut self, session_id: SessionId, now: u64) -> Result<KeyLease, EncryptionError> {
        let slot = *self
            .active
            .get(&session_id)
            .ok_or(EncryptionError::KeyMissing(session_id))?;
        let entry = self.arena[slot]
            .as_mut()
            .ok_or(EncryptionError::KeyMissing(session_id))?;
        if entry.record.is_expired(now) {
            return Err(EncryptionError::KeyExpired {
                key_id: entry.record.key_id.clone(),
                expired_at: entry.record.expires_at,
            });
        }

        let cipher = cipher_for(entry.record.algorithm);
        let key = unwrap_key(
            &self.master,
            &entry.record.key_data,
            &wrap_aad(&session_id, &entry.record.key_id),
        )?;
        let nonce = counter_nonce(cipher, &entry.nonce_prefix, entry.next_counter);
        entry.next_counter += 1;

        Ok(KeyLease {
            key_id: entry.record.key_id.clone(),
            cipher,
            key,
            nonce,
        })
    }

    /// Lease, rotating once if the active key is missing or expired.
    ///
    /// Returns the rotated key record when a rotation happened so the
    /// caller can persist it.
    pub fn lease_or_rotate(
        &mut self,
        session_id: SessionId,
        now: u64,
    ) -> Result<(KeyLease, Option<EncryptionKeyRecord>), EncryptionError> {
        match self.lease(session_id, now) {
            Ok(lease) => Ok((lease, None)),
            Err(e) if e.is_key_state() => {
                debug!(session_id = %session_id, error = %e, "Active key unusable, rotating");
                let rotated = self.rotate(session_id, now)?;
                let lease = self.lease(session_id, now)?;
                Ok((lease, Some(rotated)))
            }
            Err(e) => Err(e),
        }
    }

    /// Unwrapped key for decrypting a chunk sealed under `key_id`.
    pub fn key_for(&self, key_id: &str) -> Result<(Cipher, SecretKey), EncryptionError> {
        let entry = self
            .by_id
            .get(key_id)
            .and_then(|&slot| self.arena[slot].as_ref())
            .ok_or_else(|| EncryptionError::UnknownKey(key_id.to_string()))?;
        let key = unwrap_key(
            &self.master,
            &entry.record.key_data,
            &wrap_aad(&entry.record.session_id, key_id),
        )?;
        Ok((cipher_for(entry.record.algorithm), key))
    }

    /// Forget the active key pointer of a finished session. Its keys stay
    /// resolvable until they expire.
    pub fn release_session(&mut self, session_id: &SessionId) {
        self.active.remove(session_id);
    }

    /// Drop every key past its expiry. Returns the purged key ids.
    pub fn purge_expired(&mut self, now: u64) -> Vec<String> {
        let mut purged = Vec::new();
        for slot in 0..self.arena.len() {
            let expired = self.arena[slot]
                .as_ref()
                .is_some_and(|entry| entry.record.is_expired(now));
            if !expired {
                continue;
            }
            if let Some(entry) = self.arena[slot].take() {
                self.by_id.remove(&entry.record.key_id);
                if self.active.get(&entry.record.session_id) == Some(&slot) {
                    self.active.remove(&entry.record.session_id);
                }
                purged.push(entry.record.key_id);
            }
        }
        if !purged.is_empty() {
            info!(count = purged.len(), "Purged expired session keys");
        }
        purged
    }

    /// Active key id of a session.
    pub fn active_key_id(&self, session_id: &SessionId) -> Option<&str> {
        self.active
            .get(session_id)
            .and_then(|&slot| self.arena[slot].as_ref())
            .map(|entry| entry.record.key_id.as_str())
    }

    /// Record of a live key.
    pub fn record(&self, key_id: &str) -> Option<&EncryptionKeyRecord> {
        self.by_id
            .get(key_id)
            .and_then(|&slot| self.arena[slot].as_ref())
            .map(|entry| &entry.record)
    }

    /// Number of live (unpurged) keys.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(ttl: u64) -> KeyRing {
        KeyRing::new(SecretKey::from_bytes([1u8; 32]), CipherAlgorithm::default(), ttl)
    }

    #[test]
    fn test_one_active_key_per_session() {
        let mut keys = ring(100);
        let session = SessionId::new();
        let first = keys.create_session_key(session, 0).unwrap();
        assert_eq!(keys.active_key_id(&session), Some(first.key_id.as_str()));

        let second = keys.rotate(session, 10).unwrap();
        assert_eq!(second.rotation_count, 1);
        assert_eq!(keys.active_key_id(&session), Some(second.key_id.as_str()));
        // Old key stays resolvable for decryption
        assert!(keys.key_for(&first.key_id).is_ok());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_nonces_never_repeat() {
        let mut keys = ring(100);
        let session = SessionId::new();
        keys.create_session_key(session, 0).unwrap();
        let a = keys.lease(session, 1).unwrap();
        let b = keys.lease(session, 1).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.nonce.len(), 24);
        assert_eq!(a.key.as_bytes(), b.key.as_bytes());
    }

    #[test]
    fn test_missing_key() {
        let mut keys = ring(100);
        let session = SessionId::new();
        assert_eq!(
            keys.lease(session, 0).unwrap_err(),
            EncryptionError::KeyMissing(session)
        );
    }

    #[test]
    fn test_expired_key_rotates_exactly_once() {
        let mut keys = ring(10);
        let session = SessionId::new();
        let original = keys.create_session_key(session, 0).unwrap();

        assert!(matches!(
            keys.lease(session, 10),
            Err(EncryptionError::KeyExpired { expired_at: 10, .. })
        ));

        let (lease, rotated) = keys.lease_or_rotate(session, 10).unwrap();
        let rotated = rotated.expect("rotation");
        assert_ne!(rotated.key_id, original.key_id);
        assert_eq!(lease.key_id, rotated.key_id);
        assert_eq!(rotated.rotation_count, 1);

        // Fresh key is valid; no further rotation
        let (_, again) = keys.lease_or_rotate(session, 11).unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_purge_expired() {
        let mut keys = ring(10);
        let old = SessionId::new();
        let fresh = SessionId::new();
        let old_key = keys.create_session_key(old, 0).unwrap();
        keys.create_session_key(fresh, 5).unwrap();

        let purged = keys.purge_expired(12);
        assert_eq!(purged, vec![old_key.key_id.clone()]);
        assert_eq!(keys.active_key_id(&old), None);
        assert!(keys.active_key_id(&fresh).is_some());
        assert_eq!(
            keys.key_for(&old_key.key_id).unwrap_err(),
            EncryptionError::UnknownKey(old_key.key_id)
        );
    }

    #[test]
    fn test_wrapped_material_bound_to_master() {
        let mut keys = ring(100);
        let session = SessionId::new();
        let record = keys.create_session_key(session, 0).unwrap();

        let mut other = KeyRing::new(SecretKey::from_bytes([2u8; 32]), CipherAlgorithm::default(), 100);
        other.restore(record.clone());
        assert!(matches!(
            other.key_for(&record.key_id),
            Err(EncryptionError::Cipher(_))
        ));
    }

    #[test]
    fn test_release_keeps_keys_for_decryption() {
        let mut keys = ring(100);
        let session = SessionId::new();
        let record = keys.create_session_key(session, 0).unwrap();
        keys.release_session(&session);
        assert_eq!(keys.active_key_id(&session), None);
        assert!(keys.key_for(&record.key_id).is_ok());
    }

    #[test]
    fn test_record_serializes_with_id() {
        let mut keys = ring(100);
        let record = keys.create_session_key(SessionId::new(), 0).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], serde_json::json!(record.key_id));
        assert_eq!(json["algorithm"], "xchacha20-poly1305");
    }
}
