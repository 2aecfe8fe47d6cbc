//! # Lucid Events
//!
//! Every notification that flows through the shared bus. Pipeline stages
//! publish here instead of invoking callbacks, and audit or monitoring
//! consumers subscribe with an [`EventFilter`].

use serde::{Deserialize, Serialize};
use shared_types::{
    Hash, NodeId, OwnerAddress, ProofKey, ProofType, SessionId, SessionMetadata, SettlementEntry,
    Slot,
};

/// Subsystem id of the session pipeline.
pub const SESSION_PIPELINE: u8 = 1;
/// Subsystem id of the chain anchor client.
pub const CHAIN_ANCHOR: u8 = 2;
/// Subsystem id of the PoOT consensus.
pub const POOT_CONSENSUS: u8 = 3;

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LucidEvent {
    // =========================================================================
    // SESSION PIPELINE (lc-01)
    // =========================================================================
    /// A session record was created in `pending`.
    SessionCreated {
        session_id: SessionId,
        owner: OwnerAddress,
        started_at: u64,
    },

    /// The first chunk was accepted.
    SessionActive { session_id: SessionId },

    /// End of session reached and the Merkle root is durable.
    SessionCompleted {
        session_id: SessionId,
        merkle_root: Hash,
        chunk_count: u64,
        metadata: SessionMetadata,
    },

    /// Unrecoverable chunk, encryption or Merkle error.
    SessionFailed {
        session_id: SessionId,
        reason: String,
    },

    /// Explicit cancellation; buffered bytes were discarded.
    SessionCancelled {
        session_id: SessionId,
        discarded_bytes: u64,
    },

    // =========================================================================
    // CHAIN ANCHOR (lc-02)
    // =========================================================================
    /// Anchor transaction accepted by the chain client.
    AnchorSubmitted { session_id: SessionId, txid: String },

    /// Anchor transaction reached the confirmation threshold.
    AnchorConfirmed {
        session_id: SessionId,
        txid: String,
        confirmations: u64,
    },

    /// Retry budget exhausted; the session keeps `anchor_pending`.
    AnchorPending {
        session_id: SessionId,
        attempts: u32,
        last_error: String,
    },

    // =========================================================================
    // POOT CONSENSUS (lc-03)
    // =========================================================================
    /// A work proof passed validation and was stored.
    ProofAccepted(ProofKey),

    /// A work proof was rejected.
    ProofRejected {
        node_id: NodeId,
        slot: Slot,
        proof_type: ProofType,
        reason: String,
    },

    /// A slot was settled and rewards computed.
    SlotSettled {
        slot: Slot,
        total_credits: u64,
        entries: Vec<SettlementEntry>,
    },

    // =========================================================================
    // DEAD LETTER QUEUE
    // =========================================================================
    /// Something needs a human. Merkle input desync lands here.
    ManualAuditRequired {
        source: u8,
        session_id: Option<SessionId>,
        reason: String,
    },
}

impl LucidEvent {
    /// Topic this event is routed under.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::SessionCreated { .. }
            | Self::SessionActive { .. }
            | Self::SessionCompleted { .. }
            | Self::SessionFailed { .. }
            | Self::SessionCancelled { .. } => EventTopic::Sessions,
            Self::AnchorSubmitted { .. }
            | Self::AnchorConfirmed { .. }
            | Self::AnchorPending { .. } => EventTopic::Anchoring,
            Self::ProofAccepted(_) | Self::ProofRejected { .. } => EventTopic::Proofs,
            Self::SlotSettled { .. } => EventTopic::Settlement,
            Self::ManualAuditRequired { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Subsystem that emitted this event.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::SessionCreated { .. }
            | Self::SessionActive { .. }
            | Self::SessionCompleted { .. }
            | Self::SessionFailed { .. }
            | Self::SessionCancelled { .. } => SESSION_PIPELINE,
            Self::AnchorSubmitted { .. }
            | Self::AnchorConfirmed { .. }
            | Self::AnchorPending { .. } => CHAIN_ANCHOR,
            Self::ProofAccepted(_) | Self::ProofRejected { .. } | Self::SlotSettled { .. } => {
                POOT_CONSENSUS
            }
            Self::ManualAuditRequired { source, .. } => *source,
        }
    }

    /// Session this event concerns, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::SessionActive { session_id }
            | Self::SessionCompleted { session_id, .. }
            | Self::SessionFailed { session_id, .. }
            | Self::SessionCancelled { session_id, .. }
            | Self::AnchorSubmitted { session_id, .. }
            | Self::AnchorConfirmed { session_id, .. }
            | Self::AnchorPending { session_id, .. } => Some(*session_id),
            Self::ManualAuditRequired { session_id, .. } => *session_id,
            _ => None,
        }
    }
}

/// Event topics for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Session lifecycle.
    Sessions,
    /// Anchor submission and confirmation.
    Anchoring,
    /// Proof acceptance and rejection.
    Proofs,
    /// Slot settlement results.
    Settlement,
    /// Dead Letter Queue for events needing manual audit.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LucidEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}
