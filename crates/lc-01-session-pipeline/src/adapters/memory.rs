//! In-memory stores
//!
//! Document and blob stores kept in process memory. Used by tests and by
//! single-node deployments that do not configure an external database.

use crate::domain::EncryptionKeyRecord;
use crate::ports::{ChunkStore, SessionStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    ChunkRecord, Hash, SessionId, SessionMetadata, SessionRecord, SessionStatus, StoreError,
};
use std::collections::HashMap;

/// Session and key documents.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    keys: RwLock<HashMap<String, EncryptionKeyRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id.to_string()));
        }
        sessions.insert(record.id, record.clone());
        Ok(())
    }

    async fn append_chunk(
        &self,
        session_id: &SessionId,
        chunk: &ChunkRecord,
        metadata: &SessionMetadata,
        status: SessionStatus,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write();
        let record = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        if record.next_chunk_index() != chunk.index {
            return Err(StoreError::Conflict(chunk.chunk_id.clone()));
        }
        record.chunks.push(chunk.clone());
        record.metadata = metadata.clone();
        record.status = status;
        Ok(())
    }

    async fn update_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id.to_string())),
        }
    }

    async fn load_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn save_key(&self, key: &EncryptionKeyRecord) -> Result<(), StoreError> {
        self.keys.write().insert(key.key_id.clone(), key.clone());
        Ok(())
    }

    async fn delete_keys(&self, key_ids: &[String]) -> Result<(), StoreError> {
        let mut keys = self.keys.write();
        for id in key_ids {
            keys.remove(id);
        }
        Ok(())
    }

    async fn load_keys(&self) -> Result<Vec<EncryptionKeyRecord>, StoreError> {
        Ok(self.keys.read().values().cloned().collect())
    }
}

/// Sealed chunk payloads by ciphertext hash.
#[derive(Default)]
pub struct InMemoryChunkStore {
    blobs: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Overwrite a stored payload in place. Test helper for corruption.
    pub fn corrupt(&self, hash: &Hash) -> bool {
        match self.blobs.write().get_mut(hash) {
            Some(blob) if !blob.is_empty() => {
                blob[0] ^= 0xFF;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn put_chunk(&self, hash: Hash, ciphertext: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.write().insert(hash, ciphertext);
        Ok(())
    }

    async fn get_chunk(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::OwnerAddress;

    fn record() -> SessionRecord {
        SessionRecord::new(
            SessionId::new(),
            OwnerAddress::parse("TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE").unwrap(),
            1,
        )
    }

    fn chunk(index: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_id: format!("c-{index}"),
            index,
            size_bytes: 4,
            compressed_size_bytes: 4,
            compressed: false,
            hash: [index as u8; 32],
            encryption_nonce: vec![],
            encryption_key_id: "k".into(),
        }
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let store = InMemorySessionStore::new();
        let r = record();
        store.insert_session(&r).await.unwrap();
        assert_eq!(
            store.insert_session(&r).await,
            Err(StoreError::Conflict(r.id.to_string()))
        );
    }

    #[tokio::test]
    async fn test_append_enforces_order() {
        let store = InMemorySessionStore::new();
        let r = record();
        store.insert_session(&r).await.unwrap();
        let meta = SessionMetadata::default();
        store
            .append_chunk(&r.id, &chunk(0), &meta, SessionStatus::Active)
            .await
            .unwrap();
        assert!(store
            .append_chunk(&r.id, &chunk(2), &meta, SessionStatus::Active)
            .await
            .is_err());

        let loaded = store.load_session(&r.id).await.unwrap().unwrap();
        assert_eq!(loaded.chunks.len(), 1);
        assert_eq!(loaded.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let store = InMemorySessionStore::new();
        assert!(matches!(
            store.update_session(&record()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_chunk_store_corrupt() {
        let blobs = InMemoryChunkStore::new();
        blobs.put_chunk([1; 32], vec![1, 2, 3]).await.unwrap();
        assert!(blobs.corrupt(&[1; 32]));
        assert_eq!(blobs.get_chunk(&[1; 32]).await.unwrap(), Some(vec![0xFE, 2, 3]));
        assert!(!blobs.corrupt(&[2; 32]));
    }
}
