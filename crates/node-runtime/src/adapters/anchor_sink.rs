//! Anchor progress written back through the session pipeline.

use async_trait::async_trait;
use lc_01_session_pipeline::AnchorStatusApi;
use lc_02_chain_anchor::AnchorSink;
use shared_types::SessionId;
use std::sync::Arc;

/// `AnchorSink` over the pipeline's `AnchorStatusApi`.
pub struct SessionAnchorSink<A: AnchorStatusApi> {
    sessions: Arc<A>,
}

impl<A: AnchorStatusApi> SessionAnchorSink<A> {
    pub fn new(sessions: Arc<A>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl<A: AnchorStatusApi> AnchorSink for SessionAnchorSink<A> {
    async fn anchor_submitted(&self, session_id: SessionId, txid: &str) -> Result<(), String> {
        self.sessions
            .record_anchor_submitted(session_id, txid.to_string())
            .await
            .map_err(|e| e.to_string())
    }

    async fn anchor_confirmed(&self, session_id: SessionId) -> Result<(), String> {
        self.sessions
            .record_anchor_confirmed(session_id)
            .await
            .map_err(|e| e.to_string())
    }

    async fn anchor_pending(&self, session_id: SessionId) -> Result<(), String> {
        self.sessions
            .record_anchor_pending(session_id)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_01_session_pipeline::{SessionError, SessionResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockStatus {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnchorStatusApi for MockStatus {
        async fn record_anchor_submitted(
            &self,
            session_id: SessionId,
            txid: String,
        ) -> SessionResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("submitted {session_id} {txid}"));
            Ok(())
        }

        async fn record_anchor_confirmed(&self, session_id: SessionId) -> SessionResult<()> {
            Err(SessionError::NotFound(session_id))
        }

        async fn record_anchor_pending(&self, session_id: SessionId) -> SessionResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("pending {session_id}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_calls_forwarded_and_errors_stringified() {
        let status = Arc::new(MockStatus::default());
        let sink = SessionAnchorSink::new(status.clone());
        let id = SessionId::new();

        sink.anchor_submitted(id, "0xabc").await.unwrap();
        sink.anchor_pending(id).await.unwrap();
        let err = sink.anchor_confirmed(id).await.unwrap_err();

        assert!(err.contains(&id.to_string()));
        assert_eq!(
            *status.calls.lock().unwrap(),
            vec![format!("submitted {id} 0xabc"), format!("pending {id}")]
        );
    }
}
