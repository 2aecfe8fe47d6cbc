//! # lc-01-session-pipeline
//!
//! Session data pipeline for the Lucid node.
//!
//! ## Architecture
//!
//! A session's byte stream is cut into fixed-size chunks, each chunk is
//! compressed and sealed under the session key, the sealed payload goes to
//! the chunk store and its record is appended to the session document.
//! When the stream stops, the ordered ciphertext hashes are reduced to a
//! Merkle root and the root is handed to the anchor worker:
//!
//! ```text
//! ChunkSource ──→ Chunker ──→ zstd + AEAD ──→ ChunkStore / SessionStore
//!                                                   │
//!                                     stop ──→ Merkle root ──→ [anchor queue]
//! ```
//!
//! Lifecycle notifications go out on the shared event bus; nothing in this
//! crate calls another subsystem directly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lc_01_session_pipeline::{PipelineDependencies, SessionPipelineService};
//! use lc_01_session_pipeline::ports::SessionPipelineApi;
//!
//! let service = SessionPipelineService::new(deps)?;
//! let session = service.start_session(owner).await?;
//! let handle = service.spawn_pipeline(session.id, Box::new(source)).await?;
//! let record = handle.await??;
//! ```
//!
//! ## Security
//!
//! - Session keys are wrapped under the node master key at rest
//! - Nonces are `prefix || counter` per key and never repeat
//! - Ciphertexts are bound to `(session_id, chunk_index)` through the AEAD
//!   associated data

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{
    InMemoryChunkStore, InMemorySessionStore, QueueAnchorScheduler, RecordingEventBus,
    SharedBusAdapter,
};
pub use domain::{
    ChannelSource, ChunkSource, ChunkSourceError, EncryptionError, EncryptionKeyRecord,
    ManifestError, MerkleBuildError, PipelineConfig, ReaderSource, SessionError, SessionManifest,
    SessionResult, SourceFrame,
};
pub use ports::{
    AnchorScheduler, AnchorStatusApi, ChunkStore, EventBus, SessionPipelineApi, SessionStore,
    SystemTimeSource, TimeSource,
};
pub use service::{PipelineDependencies, SessionPipelineService, EMPTY_SESSION};
