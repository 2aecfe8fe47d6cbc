//! Error types for PoOT consensus.

use shared_types::{NodeId, ProofKey, ProofType, SessionId, Slot, StoreError};
use thiserror::Error;

/// Proof failed signature, schema or policy checks.
///
/// Every variant except `Denied` costs the node a soft trust penalty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofValidationError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid proof signature from {0}")]
    InvalidSignature(NodeId),

    #[error("Malformed {proof_type} proof: {reason}")]
    Malformed { proof_type: ProofType, reason: String },

    #[error("Slot {slot} has not started (current slot {current})")]
    FutureSlot { slot: Slot, current: Slot },

    #[error("Session {0} has no Merkle root")]
    UnknownSession(SessionId),

    #[error("Chunk {chunk_index} is not included under the root of session {session_id}")]
    InclusionProofFailed { session_id: SessionId, chunk_index: u64 },

    #[error("Claimed root does not match session {0}")]
    RootMismatch(SessionId),

    #[error("Invalid root signature for session {0}")]
    InvalidRootSignature(SessionId),

    #[error("Beacon not valid at {now} (window {issued_at}..{expires_at})")]
    BeaconOutsideWindow {
        issued_at: u64,
        expires_at: u64,
        now: u64,
    },

    #[error("Beacon lifetime {lifetime}s exceeds {max}s")]
    BeaconTooLong { lifetime: u64, max: u64 },

    #[error("Invalid beacon signature from {0}")]
    InvalidBeaconSignature(NodeId),

    #[error("Beacon nonce already used")]
    NonceReplayed,

    #[error("Node {0} is not allowed to submit proofs")]
    Denied(NodeId),
}

impl ProofValidationError {
    /// Whether the rejection adds to the node's trust penalty.
    #[must_use]
    pub fn is_penalised(&self) -> bool {
        !matches!(self, Self::Denied(_))
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownNode(_) => "unknown_node",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Malformed { .. } => "malformed",
            Self::FutureSlot { .. } => "future_slot",
            Self::UnknownSession(_) => "unknown_session",
            Self::InclusionProofFailed { .. } => "inclusion_proof",
            Self::RootMismatch(_) => "root_mismatch",
            Self::InvalidRootSignature(_) => "root_signature",
            Self::BeaconOutsideWindow { .. } => "beacon_window",
            Self::BeaconTooLong { .. } => "beacon_lifetime",
            Self::InvalidBeaconSignature(_) => "beacon_signature",
            Self::NonceReplayed => "nonce_replayed",
            Self::Denied(_) => "denied",
        }
    }
}

/// A proof with the same `(node_id, slot, proof_type)` is already stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate proof {}", .0.document_id())]
pub struct DuplicateProofError(pub ProofKey);

/// The proof's slot is already closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Slot {slot} is closed")]
pub struct LateProofError {
    pub slot: Slot,
}

/// Everything `submit_proof` can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofSubmissionError {
    #[error(transparent)]
    Validation(#[from] ProofValidationError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateProofError),

    #[error(transparent)]
    Late(#[from] LateProofError),

    /// Store or identity lookup failed; the proof was not judged.
    #[error("Proof store error: {0}")]
    Store(#[from] StoreError),
}

/// Settlement sweep failure. The sweep is retried on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Slot {slot} is still open (current slot {current})")]
    SlotOpen { slot: Slot, current: Slot },

    #[error("Settlement store error: {0}")]
    Store(#[from] StoreError),

    #[error("Reward ledger rejected slot {slot}: {reason}")]
    Ledger { slot: Slot, reason: String },
}

/// Invalid PoOT configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PootConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Trust rule {0} has an empty condition list")]
    EmptyRule(usize),
}
