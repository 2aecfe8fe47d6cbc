//! Driven ports (Outbound dependencies)

use crate::domain::EncryptionKeyRecord;
use async_trait::async_trait;
use shared_bus::LucidEvent;
use shared_types::{
    AnchorRequest, ChunkRecord, Hash, SessionId, SessionMetadata, SessionRecord, SessionStatus,
    StoreError,
};

/// Document store for session and key documents.
///
/// Every call is wrapped in the configured storage timeout by the service.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Append one chunk and refresh the running metadata and status.
    async fn append_chunk(
        &self,
        session_id: &SessionId,
        chunk: &ChunkRecord,
        metadata: &SessionMetadata,
        status: SessionStatus,
    ) -> Result<(), StoreError>;

    /// Replace the whole session document.
    async fn update_session(&self, record: &SessionRecord) -> Result<(), StoreError>;

    async fn load_session(&self, session_id: &SessionId)
        -> Result<Option<SessionRecord>, StoreError>;

    async fn save_key(&self, key: &EncryptionKeyRecord) -> Result<(), StoreError>;

    async fn delete_keys(&self, key_ids: &[String]) -> Result<(), StoreError>;

    async fn load_keys(&self) -> Result<Vec<EncryptionKeyRecord>, StoreError>;
}

/// Blob store for sealed chunk payloads, addressed by ciphertext hash.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn put_chunk(&self, hash: Hash, ciphertext: Vec<u8>) -> Result<(), StoreError>;

    async fn get_chunk(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Hand-off to the anchor worker.
///
/// Must return without waiting on chain I/O.
#[async_trait]
pub trait AnchorScheduler: Send + Sync {
    async fn schedule_anchor(&self, request: AnchorRequest) -> Result<(), String>;
}

/// Event bus for session lifecycle notifications
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: LucidEvent) -> Result<(), String>;
}

/// Time source
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in seconds
    fn now(&self) -> u64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        shared_types::unix_now()
    }
}
