//! Session roots for proof validation, read from the session pipeline.

use async_trait::async_trait;
use lc_01_session_pipeline::{SessionError, SessionPipelineApi};
use lc_03_poot_consensus::{SessionRoot, SessionRootLookup};
use shared_types::{SessionId, StoreError};
use std::sync::Arc;

/// `SessionRootLookup` over the pipeline's session documents.
///
/// Unknown sessions and sessions without a root are both `None`; the
/// validator rejects the proof either way.
pub struct PipelineRootLookup<P: SessionPipelineApi> {
    pipeline: Arc<P>,
}

impl<P: SessionPipelineApi> PipelineRootLookup<P> {
    pub fn new(pipeline: Arc<P>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl<P: SessionPipelineApi> SessionRootLookup for PipelineRootLookup<P> {
    async fn session_root(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionRoot>, StoreError> {
        match self.pipeline.get_session(session_id).await {
            Ok(record) => Ok(record.merkle_root.map(|merkle_root| SessionRoot {
                merkle_root,
                chunk_count: record.chunks.len() as u64,
            })),
            Err(SessionError::NotFound(_)) => Ok(None),
            Err(SessionError::Store(e)) => Err(e),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }
}
