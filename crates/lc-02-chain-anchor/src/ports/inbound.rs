//! Driving ports (Inbound API)

use crate::domain::AnchorOutcome;
use async_trait::async_trait;
use shared_types::{AnchorRequest, SessionId};

/// Anchor client API.
#[async_trait]
pub trait AnchorClientApi: Send + Sync {
    /// Submit a session root with backoff, then wait for confirmations.
    ///
    /// Never fails: every failure mode is an [`AnchorOutcome`].
    async fn anchor(&self, request: AnchorRequest) -> AnchorOutcome;

    /// Poll an already submitted transaction until it is buried deep
    /// enough or the poll budget runs out.
    async fn await_confirmations(&self, session_id: SessionId, txid: String) -> AnchorOutcome;
}
