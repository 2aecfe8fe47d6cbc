//! Driving ports (Inbound API)

use crate::domain::{ChunkSource, SessionManifest, SessionResult};
use async_trait::async_trait;
use shared_crypto::MerkleProof;
use shared_types::{Hash, OwnerAddress, SessionId, SessionRecord};
use tokio::task::JoinHandle;

/// Session pipeline API.
#[async_trait]
pub trait SessionPipelineApi: Send + Sync {
    /// Create a `pending` session with a fresh session key.
    async fn start_session(&self, owner: OwnerAddress) -> SessionResult<SessionRecord>;

    /// Run the chunk pipeline for a pending session on its own task.
    ///
    /// Fails with `TooManySessions` when the concurrency limit is reached.
    /// The handle resolves to the final record, or the error that failed
    /// the session.
    async fn spawn_pipeline(
        &self,
        session_id: SessionId,
        source: Box<dyn ChunkSource>,
    ) -> SessionResult<JoinHandle<SessionResult<SessionRecord>>>;

    /// Cancel a non-terminal session, discarding buffered bytes.
    async fn cancel_session(&self, session_id: SessionId) -> SessionResult<()>;

    /// Current session document.
    async fn get_session(&self, session_id: SessionId) -> SessionResult<SessionRecord>;

    /// Plaintext of one stored chunk.
    async fn decrypt_chunk(&self, session_id: SessionId, index: u64) -> SessionResult<Vec<u8>>;

    /// Merkle root of a completed session, `None` otherwise.
    async fn session_root(&self, session_id: SessionId) -> SessionResult<Option<Hash>>;

    /// Inclusion proof of one chunk under the session root.
    async fn chunk_proof(&self, session_id: SessionId, index: u64) -> SessionResult<MerkleProof>;

    /// Sessions with a running pipeline.
    fn active_session_count(&self) -> usize;

    /// Signed manifest of a completed session.
    async fn generate_manifest(&self, session_id: SessionId) -> SessionResult<SessionManifest>;

    /// Check a manifest's signature and chunk list, and that its root is
    /// the one stored for the session.
    async fn verify_manifest(&self, manifest: &SessionManifest) -> SessionResult<()>;

    /// Public key manifests are signed with.
    fn manifest_signer(&self) -> [u8; 32];
}

/// Callbacks from the anchor worker back into the session documents.
#[async_trait]
pub trait AnchorStatusApi: Send + Sync {
    async fn record_anchor_submitted(&self, session_id: SessionId, txid: String)
        -> SessionResult<()>;

    async fn record_anchor_confirmed(&self, session_id: SessionId) -> SessionResult<()>;

    async fn record_anchor_pending(&self, session_id: SessionId) -> SessionResult<()>;
}
