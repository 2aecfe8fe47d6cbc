//! Driven ports (Outbound dependencies)

use crate::domain::AnchorSubmissionError;
use async_trait::async_trait;
use shared_bus::LucidEvent;
use shared_types::{AnchorRequest, SessionId};

/// Chain-submission client.
///
/// Implementations must not retry internally; the service owns the retry
/// budget and wraps every call in the RPC deadline.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Send the anchor transaction and return its id.
    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<String, AnchorSubmissionError>;

    /// Current confirmation depth; 0 while the transaction is unmined.
    ///
    /// A reverted transaction is `AnchorSubmissionError::Rejected`.
    async fn get_confirmations(&self, txid: &str) -> Result<u64, AnchorSubmissionError>;
}

/// Where anchor progress is written back to the session documents.
#[async_trait]
pub trait AnchorSink: Send + Sync {
    async fn anchor_submitted(&self, session_id: SessionId, txid: &str) -> Result<(), String>;

    async fn anchor_confirmed(&self, session_id: SessionId) -> Result<(), String>;

    async fn anchor_pending(&self, session_id: SessionId) -> Result<(), String>;
}

/// Event bus for anchor notifications
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: LucidEvent) -> Result<(), String>;
}
