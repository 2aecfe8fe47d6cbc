//! Domain layer: pure pipeline logic with no I/O.

pub mod chunker;
pub mod compression;
pub mod config;
pub mod encryption;
pub mod errors;
pub mod keyring;
pub mod manifest;
pub mod merkle_builder;
pub mod session;

pub use chunker::{ChannelSource, Chunk, ChunkSource, Chunker, ReaderSource, SourceFrame};
pub use compression::{ChunkCompressor, CompressionConfig, ZstdCompressor};
pub use config::PipelineConfig;
pub use encryption::{chunk_aad, ChunkEncryptor, EncryptedChunk};
pub use errors::*;
pub use keyring::{EncryptionKeyRecord, KeyLease, KeyRing};
pub use manifest::{ManifestChunk, ManifestError, SessionManifest};
pub use merkle_builder::{build_session_root, check_sequence, chunk_inclusion_proof};
