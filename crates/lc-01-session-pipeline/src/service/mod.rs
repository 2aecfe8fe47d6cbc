//! Session Pipeline Service
//!
//! # Architecture
//! - One tokio task per session, bounded by a semaphore
//! - chunk -> compress + encrypt -> store -> append, strictly in index order
//! - Sealing and Merkle builds run on the blocking pool
//! - Anchoring is a queue hand-off; the pipeline never waits on the chain
//! - Cancellation arrives on a per-session `watch` channel and is checked
//!   between frames

use crate::domain::session;
use crate::domain::{
    build_session_root, chunk_inclusion_proof, Chunk, ChunkEncryptor, ChunkSource, Chunker,
    CompressionConfig, EncryptedChunk, KeyRing, ManifestError, MerkleBuildError, PipelineConfig,
    SessionError, SessionManifest, SessionResult, SourceFrame, ZstdCompressor,
};
use crate::metrics;
use crate::ports::{
    AnchorScheduler, AnchorStatusApi, ChunkStore, EventBus, SessionPipelineApi, SessionStore,
    SystemTimeSource, TimeSource,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{LucidEvent, SESSION_PIPELINE};
use shared_crypto::hashing::blake3_derive_key;
use shared_crypto::{Ed25519KeyPair, MerkleProof, SecretKey};
use shared_types::{AnchorRequest, Hash, OwnerAddress, SessionId, SessionRecord, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Reason recorded when a session stops before any data arrived.
pub const EMPTY_SESSION: &str = "empty session";

const MANIFEST_KEY_CONTEXT: &str = "lucid session manifest signing key v1";

/// Dependencies for SessionPipelineService
pub struct PipelineDependencies<S, C, A, E> {
    pub store: Arc<S>,
    pub chunk_store: Arc<C>,
    pub anchors: Arc<A>,
    pub event_bus: Arc<E>,
    /// Wraps every session key at rest
    pub master_key: SecretKey,
    pub config: PipelineConfig,
}

/// Cancel channel of a known session. `idle` holds the receiver until a
/// pipeline claims it.
struct SessionSlot {
    cancel: watch::Sender<bool>,
    idle: Option<watch::Receiver<bool>>,
}

enum StreamEnd {
    Stopped,
    Cancelled,
}

enum CancelRoute {
    Signalled,
    Direct,
    /// Claimed an idle session; the slot stays until the cancel is saved.
    Idle(watch::Receiver<bool>),
}

/// Session Pipeline Service
pub struct SessionPipelineService<S, C, A, E>
where
    S: SessionStore,
    C: ChunkStore,
    A: AnchorScheduler,
    E: EventBus,
{
    store: Arc<S>,
    chunk_store: Arc<C>,
    anchors: Arc<A>,
    event_bus: Arc<E>,
    config: Arc<PipelineConfig>,
    keyring: Arc<Mutex<KeyRing>>,
    encryptor: Arc<ChunkEncryptor>,
    registry: Arc<Mutex<HashMap<SessionId, SessionSlot>>>,
    permits: Arc<Semaphore>,
    /// Derived from the master key, so it is stable across restarts.
    manifest_key: Arc<Ed25519KeyPair>,
    time_source: Arc<dyn TimeSource>,
}

impl<S, C, A, E> Clone for SessionPipelineService<S, C, A, E>
where
    S: SessionStore,
    C: ChunkStore,
    A: AnchorScheduler,
    E: EventBus,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            chunk_store: Arc::clone(&self.chunk_store),
            anchors: Arc::clone(&self.anchors),
            event_bus: Arc::clone(&self.event_bus),
            config: Arc::clone(&self.config),
            keyring: Arc::clone(&self.keyring),
            encryptor: Arc::clone(&self.encryptor),
            registry: Arc::clone(&self.registry),
            permits: Arc::clone(&self.permits),
            manifest_key: Arc::clone(&self.manifest_key),
            time_source: Arc::clone(&self.time_source),
        }
    }
}

impl<S, C, A, E> SessionPipelineService<S, C, A, E>
where
    S: SessionStore + 'static,
    C: ChunkStore + 'static,
    A: AnchorScheduler + 'static,
    E: EventBus + 'static,
{
    /// Create a new SessionPipelineService
    pub fn new(deps: PipelineDependencies<S, C, A, E>) -> SessionResult<Self> {
        deps.config.validate()?;
        let compressor = ZstdCompressor::new(CompressionConfig {
            level: deps.config.compression_level,
            enabled: deps.config.compression_enabled,
        });
        let manifest_key = Ed25519KeyPair::from_seed(blake3_derive_key(
            MANIFEST_KEY_CONTEXT,
            deps.master_key.as_bytes(),
        ));
        let keyring = KeyRing::new(deps.master_key, deps.config.cipher, deps.config.key_ttl_secs);

        Ok(Self {
            store: deps.store,
            chunk_store: deps.chunk_store,
            anchors: deps.anchors,
            event_bus: deps.event_bus,
            permits: Arc::new(Semaphore::new(deps.config.max_concurrent_sessions)),
            config: Arc::new(deps.config),
            keyring: Arc::new(Mutex::new(keyring)),
            encryptor: Arc::new(ChunkEncryptor::new(Box::new(compressor))),
            registry: Arc::new(Mutex::new(HashMap::new())),
            manifest_key: Arc::new(manifest_key),
            time_source: Arc::new(SystemTimeSource),
        })
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn now(&self) -> u64 {
        self.time_source.now()
    }

    // === STORAGE HELPERS ===

    async fn with_timeout<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.config.storage_timeout;
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit.as_millis() as u64)),
        }
    }

    async fn load(&self, session_id: SessionId) -> SessionResult<SessionRecord> {
        self.with_timeout(self.store.load_session(&session_id))
            .await?
            .ok_or(SessionError::NotFound(session_id))
    }

    async fn publish(&self, event: LucidEvent) {
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(error = %e, "Failed to publish session event");
        }
    }

    /// Apply a transition to a copy and adopt it once the store accepted it,
    /// so `record` always mirrors the last persisted status.
    async fn commit<F>(&self, record: &mut SessionRecord, transition: F) -> SessionResult<()>
    where
        F: FnOnce(&mut SessionRecord) -> SessionResult<()>,
    {
        let mut next = record.clone();
        transition(&mut next)?;
        self.with_timeout(self.store.update_session(&next)).await?;
        *record = next;
        Ok(())
    }

    // === KEY MAINTENANCE ===

    /// Drop expired session keys from the keyring and the store.
    pub async fn purge_expired_keys(&self) -> SessionResult<usize> {
        let purged = self.keyring.lock().purge_expired(self.now());
        if !purged.is_empty() {
            self.with_timeout(self.store.delete_keys(&purged)).await?;
        }
        Ok(purged.len())
    }

    /// Reload unexpired key documents after a restart so stored chunks stay
    /// decryptable.
    pub async fn restore_keys(&self) -> SessionResult<usize> {
        let records = self.with_timeout(self.store.load_keys()).await?;
        let now = self.now();
        let mut keyring = self.keyring.lock();
        let mut restored = 0;
        for record in records.into_iter().filter(|r| !r.is_expired(now)) {
            keyring.restore(record);
            restored += 1;
        }
        Ok(restored)
    }

    // === PIPELINE ===

    async fn run_pipeline(
        self,
        mut record: SessionRecord,
        mut source: Box<dyn ChunkSource>,
        mut cancel: watch::Receiver<bool>,
        _permit: OwnedSemaphorePermit,
    ) -> SessionResult<SessionRecord> {
        let session_id = record.id;
        let mut chunker = Chunker::new(self.config.max_chunk_size);

        let outcome = match self.begin(&mut record).await {
            Ok(()) => {
                self.drive(&mut record, &mut chunker, source.as_mut(), &mut cancel)
                    .await
            }
            Err(e) => Err(e),
        };

        let finished = match outcome {
            Ok(StreamEnd::Stopped) => self.finalize(&mut record, chunker.next_index()).await,
            Ok(StreamEnd::Cancelled) => {
                let discarded = chunker.discard();
                self.finish_cancelled(&mut record, discarded).await
            }
            Err(e) => Err(e),
        };

        let result = match finished {
            Ok(()) => Ok(record),
            Err(err) => {
                chunker.discard();
                self.finish_failed(&mut record, &err).await;
                Err(err)
            }
        };

        self.registry.lock().remove(&session_id);
        self.keyring.lock().release_session(&session_id);
        result
    }

    async fn begin(&self, record: &mut SessionRecord) -> SessionResult<()> {
        let now = self.now();
        self.commit(record, |r| session::begin_processing(r, now))
            .await?;
        debug!(session_id = %record.id, "Session processing");
        Ok(())
    }

    async fn drive(
        &self,
        record: &mut SessionRecord,
        chunker: &mut Chunker,
        source: &mut dyn ChunkSource,
        cancel: &mut watch::Receiver<bool>,
    ) -> SessionResult<StreamEnd> {
        loop {
            let cancelled = *cancel.borrow();
            if cancelled {
                return Ok(StreamEnd::Cancelled);
            }
            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    let cancelled = *cancel.borrow();
                    if changed.is_err() || cancelled {
                        return Ok(StreamEnd::Cancelled);
                    }
                }
                frame = source.next_frame() => match frame? {
                    SourceFrame::Data(bytes) => {
                        for chunk in chunker.push(&bytes) {
                            self.process_chunk(record, chunk).await?;
                        }
                    }
                    SourceFrame::Stop => {
                        if let Some(chunk) = chunker.finish() {
                            self.process_chunk(record, chunk).await?;
                        }
                        return Ok(StreamEnd::Stopped);
                    }
                }
            }
        }
    }

    async fn process_chunk(&self, record: &mut SessionRecord, chunk: Chunk) -> SessionResult<()> {
        let started = Instant::now();
        let now = self.now();
        let session_id = record.id;

        let (lease, rotated) = self.keyring.lock().lease_or_rotate(session_id, now)?;
        if let Some(rotated) = rotated {
            metrics::record_key_rotation();
            self.with_timeout(self.store.save_key(&rotated)).await?;
        }

        let plaintext_len = chunk.data.len() as u64;
        let encryptor = Arc::clone(&self.encryptor);
        let EncryptedChunk {
            record: chunk_record,
            ciphertext,
        } = tokio::task::spawn_blocking(move || encryptor.encrypt(&session_id, &chunk, &lease))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))??;
        let encryption_ms = started.elapsed().as_millis() as u64;

        self.with_timeout(self.chunk_store.put_chunk(chunk_record.hash, ciphertext))
            .await?;
        let became_active = session::append_chunk(record, chunk_record.clone(), encryption_ms, now)?;
        self.with_timeout(self.store.append_chunk(
            &session_id,
            &chunk_record,
            &record.metadata,
            record.status,
        ))
        .await?;

        metrics::record_chunk_sealed(plaintext_len);
        debug!(
            session_id = %session_id,
            index = chunk_record.index,
            size = plaintext_len,
            compressed = chunk_record.compressed,
            "Chunk sealed"
        );
        if became_active {
            self.publish(LucidEvent::SessionActive { session_id }).await;
        }
        Ok(())
    }

    async fn finalize(&self, record: &mut SessionRecord, produced: u64) -> SessionResult<()> {
        let session_id = record.id;
        let now = self.now();

        if record.chunks.is_empty() {
            self.commit(record, |r| session::cancel(r, Some(EMPTY_SESSION.to_string()), now))
                .await?;
            metrics::record_session_finished(record.status.as_str());
            info!(session_id = %session_id, "Session stopped before any data, cancelled");
            self.publish(LucidEvent::SessionCancelled {
                session_id,
                discarded_bytes: 0,
            })
            .await;
            return Ok(());
        }

        let chunks = record.chunks.clone();
        let started = Instant::now();
        let built = tokio::task::spawn_blocking(move || build_session_root(produced, &chunks))
            .await
            .map_err(|e| SessionError::Worker(e.to_string()))?;
        let root = match built {
            Ok(Some(root)) => root,
            Ok(None) => return Err(MerkleBuildError::NoRoot.into()),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Merkle input desync, manual audit required");
                self.publish(LucidEvent::ManualAuditRequired {
                    source: SESSION_PIPELINE,
                    session_id: Some(session_id),
                    reason: e.to_string(),
                })
                .await;
                return Err(e.into());
            }
        };
        let elapsed = started.elapsed();
        metrics::record_merkle_build(elapsed.as_secs_f64());

        let build_ms = elapsed.as_millis() as u64;
        self.commit(record, |r| session::complete(r, root, build_ms, now))
            .await?;
        metrics::record_session_finished(record.status.as_str());
        info!(
            session_id = %session_id,
            chunk_count = record.chunks.len(),
            original_size = record.metadata.original_size,
            compressed_size = record.metadata.compressed_size,
            merkle_root = %hex::encode(root),
            "Session completed"
        );
        self.publish(LucidEvent::SessionCompleted {
            session_id,
            merkle_root: root,
            chunk_count: record.chunks.len() as u64,
            metadata: record.metadata.clone(),
        })
        .await;

        let request = AnchorRequest {
            session_id,
            merkle_root: root,
            owner: record.owner_address.clone(),
            requested_at: now,
        };
        if let Err(reason) = self.anchors.schedule_anchor(request).await {
            warn!(session_id = %session_id, reason = %reason, "Anchor hand-off failed, marking anchor pending");
            self.commit(record, session::mark_anchor_pending).await?;
        }
        Ok(())
    }

    async fn finish_cancelled(&self, record: &mut SessionRecord, discarded: u64) -> SessionResult<()> {
        let session_id = record.id;
        let now = self.now();
        self.commit(record, |r| session::cancel(r, None, now)).await?;
        metrics::record_session_finished(record.status.as_str());
        info!(session_id = %session_id, discarded_bytes = discarded, "Session cancelled");
        self.publish(LucidEvent::SessionCancelled {
            session_id,
            discarded_bytes: discarded,
        })
        .await;
        Ok(())
    }

    async fn finish_failed(&self, record: &mut SessionRecord, err: &SessionError) {
        let session_id = record.id;
        error!(session_id = %session_id, status = %record.status, error = %err, "Session pipeline failed");
        if record.status.is_terminal() {
            return;
        }
        if session::fail(record, err.to_string(), self.now()).is_err() {
            return;
        }
        if let Err(e) = self.with_timeout(self.store.update_session(record)).await {
            error!(session_id = %session_id, error = %e, "Could not persist failed status");
        }
        metrics::record_session_finished(record.status.as_str());
        self.publish(LucidEvent::SessionFailed {
            session_id,
            reason: err.to_string(),
        })
        .await;
    }

    async fn cancel_directly(&self, session_id: SessionId) -> SessionResult<()> {
        let mut record = self.load(session_id).await?;
        session::cancel(&mut record, None, self.now())?;
        self.with_timeout(self.store.update_session(&record)).await?;
        self.keyring.lock().release_session(&session_id);
        metrics::record_session_finished(record.status.as_str());
        info!(session_id = %session_id, "Idle session cancelled");
        self.publish(LucidEvent::SessionCancelled {
            session_id,
            discarded_bytes: 0,
        })
        .await;
        Ok(())
    }
}

#[async_trait]
impl<S, C, A, E> SessionPipelineApi for SessionPipelineService<S, C, A, E>
where
    S: SessionStore + 'static,
    C: ChunkStore + 'static,
    A: AnchorScheduler + 'static,
    E: EventBus + 'static,
{
    async fn start_session(&self, owner: OwnerAddress) -> SessionResult<SessionRecord> {
        let now = self.now();
        let record = SessionRecord::new(SessionId::new(), owner, now);

        let key = self.keyring.lock().create_session_key(record.id, now)?;
        self.with_timeout(self.store.save_key(&key)).await?;
        self.with_timeout(self.store.insert_session(&record)).await?;

        let (cancel, idle) = watch::channel(false);
        self.registry.lock().insert(
            record.id,
            SessionSlot {
                cancel,
                idle: Some(idle),
            },
        );

        info!(session_id = %record.id, owner = %record.owner_address, "Session created");
        self.publish(LucidEvent::SessionCreated {
            session_id: record.id,
            owner: record.owner_address.clone(),
            started_at: now,
        })
        .await;
        Ok(record)
    }

    async fn spawn_pipeline(
        &self,
        session_id: SessionId,
        source: Box<dyn ChunkSource>,
    ) -> SessionResult<JoinHandle<SessionResult<SessionRecord>>> {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| SessionError::TooManySessions {
                limit: self.config.max_concurrent_sessions,
            })?;

        let cancel = {
            let mut registry = self.registry.lock();
            match registry.get_mut(&session_id) {
                Some(slot) => slot
                    .idle
                    .take()
                    .ok_or(SessionError::AlreadyRunning(session_id))?,
                None => {
                    // Session created before a restart
                    let (tx, rx) = watch::channel(false);
                    registry.insert(
                        session_id,
                        SessionSlot {
                            cancel: tx,
                            idle: None,
                        },
                    );
                    rx
                }
            }
        };

        let record = match self.load(session_id).await {
            Ok(record) if record.status == shared_types::SessionStatus::Pending => record,
            Ok(record) => {
                self.registry.lock().remove(&session_id);
                return Err(if record.status.is_terminal() {
                    SessionError::AlreadyTerminal(record.status)
                } else {
                    SessionError::AlreadyRunning(session_id)
                });
            }
            Err(e) => {
                self.registry.lock().remove(&session_id);
                return Err(e);
            }
        };

        let service = self.clone();
        Ok(tokio::spawn(async move {
            service.run_pipeline(record, source, cancel, permit).await
        }))
    }

    async fn cancel_session(&self, session_id: SessionId) -> SessionResult<()> {
        let route = {
            let mut registry = self.registry.lock();
            let running = registry.get(&session_id).map(|slot| slot.idle.is_none());
            match running {
                Some(true) => {
                    let delivered = registry
                        .get(&session_id)
                        .is_some_and(|slot| slot.cancel.send(true).is_ok());
                    if delivered {
                        CancelRoute::Signalled
                    } else {
                        CancelRoute::Direct
                    }
                }
                Some(false) => match registry.get_mut(&session_id).and_then(|s| s.idle.take()) {
                    Some(idle) => CancelRoute::Idle(idle),
                    None => CancelRoute::Direct,
                },
                None => CancelRoute::Direct,
            }
        };

        match route {
            CancelRoute::Signalled => {
                debug!(session_id = %session_id, "Cancellation signalled to pipeline");
                Ok(())
            }
            CancelRoute::Direct => self.cancel_directly(session_id).await,
            CancelRoute::Idle(idle) => {
                let result = self.cancel_directly(session_id).await;
                let mut registry = self.registry.lock();
                match &result {
                    Err(e) if !matches!(e, SessionError::AlreadyTerminal(_)) => {
                        if let Some(slot) = registry.get_mut(&session_id) {
                            slot.idle = Some(idle);
                        }
                    }
                    _ => {
                        registry.remove(&session_id);
                    }
                }
                result
            }
        }
    }

    async fn get_session(&self, session_id: SessionId) -> SessionResult<SessionRecord> {
        self.load(session_id).await
    }

    async fn decrypt_chunk(&self, session_id: SessionId, index: u64) -> SessionResult<Vec<u8>> {
        let record = self.load(session_id).await?;
        let chunk = record
            .chunks
            .get(index as usize)
            .filter(|c| c.index == index)
            .cloned()
            .ok_or(SessionError::ChunkNotFound { session_id, index })?;

        let ciphertext = self
            .with_timeout(self.chunk_store.get_chunk(&chunk.hash))
            .await?
            .ok_or_else(|| StoreError::NotFound(chunk.chunk_id.clone()))?;
        let (cipher, key) = self.keyring.lock().key_for(&chunk.encryption_key_id)?;

        let encryptor = Arc::clone(&self.encryptor);
        let plaintext = tokio::task::spawn_blocking(move || {
            encryptor.decrypt(&session_id, &chunk, &ciphertext, cipher, &key)
        })
        .await
        .map_err(|e| SessionError::Worker(e.to_string()))??;
        Ok(plaintext)
    }

    async fn session_root(&self, session_id: SessionId) -> SessionResult<Option<Hash>> {
        Ok(self.load(session_id).await?.merkle_root)
    }

    async fn chunk_proof(&self, session_id: SessionId, index: u64) -> SessionResult<MerkleProof> {
        let record = self.load(session_id).await?;
        Ok(chunk_inclusion_proof(&record, index)?)
    }

    fn active_session_count(&self) -> usize {
        self.config.max_concurrent_sessions - self.permits.available_permits()
    }

    async fn generate_manifest(&self, session_id: SessionId) -> SessionResult<SessionManifest> {
        let record = self.load(session_id).await?;
        let manifest = SessionManifest::generate(
            &record,
            &self.manifest_key,
            uuid::Uuid::new_v4().to_string(),
            self.now(),
        )?;
        debug!(session_id = %session_id, manifest_id = %manifest.manifest_id, "Manifest generated");
        Ok(manifest)
    }

    async fn verify_manifest(&self, manifest: &SessionManifest) -> SessionResult<()> {
        manifest.verify(&self.manifest_signer())?;
        let record = self.load(manifest.session_id).await?;
        if record.merkle_root != Some(manifest.merkle_root) {
            return Err(ManifestError::RootMismatch.into());
        }
        Ok(())
    }

    fn manifest_signer(&self) -> [u8; 32] {
        *self.manifest_key.public_key().as_bytes()
    }
}

#[async_trait]
impl<S, C, A, E> AnchorStatusApi for SessionPipelineService<S, C, A, E>
where
    S: SessionStore + 'static,
    C: ChunkStore + 'static,
    A: AnchorScheduler + 'static,
    E: EventBus + 'static,
{
    async fn record_anchor_submitted(
        &self,
        session_id: SessionId,
        txid: String,
    ) -> SessionResult<()> {
        let mut record = self.load(session_id).await?;
        session::set_anchor_txid(&mut record, txid)?;
        self.with_timeout(self.store.update_session(&record)).await?;
        Ok(())
    }

    async fn record_anchor_confirmed(&self, session_id: SessionId) -> SessionResult<()> {
        let mut record = self.load(session_id).await?;
        session::mark_anchor_confirmed(&mut record)?;
        self.with_timeout(self.store.update_session(&record)).await?;
        Ok(())
    }

    async fn record_anchor_pending(&self, session_id: SessionId) -> SessionResult<()> {
        let mut record = self.load(session_id).await?;
        session::mark_anchor_pending(&mut record)?;
        self.with_timeout(self.store.update_session(&record)).await?;
        Ok(())
    }
}
