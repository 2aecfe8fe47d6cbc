//! In-memory anchor sink.

use crate::ports::AnchorSink;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::SessionId;

/// Anchor progress as the sink saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Submitted { session_id: SessionId, txid: String },
    Confirmed { session_id: SessionId },
    Pending { session_id: SessionId },
}

/// Records every call, in order.
#[derive(Default)]
pub struct RecordingAnchorSink {
    calls: RwLock<Vec<SinkCall>>,
}

impl RecordingAnchorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.read().clone()
    }

    pub fn calls_for(&self, session_id: SessionId) -> Vec<SinkCall> {
        self.calls
            .read()
            .iter()
            .filter(|call| match call {
                SinkCall::Submitted { session_id: id, .. }
                | SinkCall::Confirmed { session_id: id }
                | SinkCall::Pending { session_id: id } => *id == session_id,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AnchorSink for RecordingAnchorSink {
    async fn anchor_submitted(&self, session_id: SessionId, txid: &str) -> Result<(), String> {
        self.calls.write().push(SinkCall::Submitted {
            session_id,
            txid: txid.to_owned(),
        });
        Ok(())
    }

    async fn anchor_confirmed(&self, session_id: SessionId) -> Result<(), String> {
        self.calls.write().push(SinkCall::Confirmed { session_id });
        Ok(())
    }

    async fn anchor_pending(&self, session_id: SessionId) -> Result<(), String> {
        self.calls.write().push(SinkCall::Pending { session_id });
        Ok(())
    }
}
