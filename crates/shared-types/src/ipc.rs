//! # Cross-Subsystem Payloads
//!
//! Messages handed between the session pipeline and the anchor client.
//! They travel over an `mpsc` queue, never over a direct call.

use crate::entities::{Hash, OwnerAddress, SessionId};
use serde::{Deserialize, Serialize};

/// Request to anchor a completed session's Merkle root on chain.
/// Sender: session pipeline | Receiver: anchor worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub session_id: SessionId,
    pub merkle_root: Hash,
    pub owner: OwnerAddress,
    /// Unix seconds when the session completed.
    pub requested_at: u64,
}
