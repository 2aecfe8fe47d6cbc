//! Driven ports (Outbound dependencies)

use crate::domain::{SettlementRecord, TrustRecord, WorkProof};
use async_trait::async_trait;
use shared_bus::LucidEvent;
use shared_types::{Hash, NodeId, ProofKey, SessionId, Slot, StoreError};

/// Result of an atomic proof insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Same `(node_id, slot, proof_type)` already stored.
    Duplicate,
    /// The slot closed before the insert.
    SlotClosed,
}

/// Proof and settlement documents.
///
/// `insert_if_absent` and `commit_settlement` must be atomic with respect
/// to each other: a proof is either in a slot's settlement or rejected as
/// late, never both.
#[async_trait]
pub trait ProofStore: Send + Sync {
    async fn insert_if_absent(&self, proof: &WorkProof) -> Result<InsertOutcome, StoreError>;

    async fn load_proof(&self, key: &ProofKey) -> Result<Option<WorkProof>, StoreError>;

    async fn close_slot(&self, slot: Slot) -> Result<(), StoreError>;

    async fn is_slot_closed(&self, slot: Slot) -> Result<bool, StoreError>;

    async fn verified_proofs(&self, slot: Slot) -> Result<Vec<WorkProof>, StoreError>;

    /// Store `record` and write its rewards onto the proofs.
    ///
    /// If the slot already has a record, nothing changes and the stored
    /// record is returned.
    async fn commit_settlement(&self, record: &SettlementRecord)
        -> Result<SettlementRecord, StoreError>;

    async fn load_settlement(&self, slot: Slot) -> Result<Option<SettlementRecord>, StoreError>;

    async fn mark_published(&self, slot: Slot) -> Result<(), StoreError>;

    /// Every settlement record, by slot.
    async fn settlements(&self) -> Result<Vec<SettlementRecord>, StoreError>;

    async fn unpublished_settlements(&self) -> Result<Vec<SettlementRecord>, StoreError>;

    /// Slots before `current` holding proofs but no settlement.
    async fn unsettled_slots_before(&self, current: Slot) -> Result<Vec<Slot>, StoreError>;
}

/// Per-node trust records.
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn load_trust(&self, node_id: &NodeId) -> Result<Option<TrustRecord>, StoreError>;

    async fn save_trust(&self, record: &TrustRecord) -> Result<(), StoreError>;
}

/// Node identity registry.
#[async_trait]
pub trait NodeIdentityRegistry: Send + Sync {
    /// Registered Ed25519 public key, `None` for unknown nodes.
    async fn get_public_key(&self, node_id: &NodeId) -> Result<Option<[u8; 32]>, StoreError>;
}

/// Root of a completed session and the number of chunks under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRoot {
    pub merkle_root: Hash,
    pub chunk_count: u64,
}

/// Merkle roots of completed sessions.
#[async_trait]
pub trait SessionRootLookup: Send + Sync {
    async fn session_root(&self, session_id: SessionId)
        -> Result<Option<SessionRoot>, StoreError>;
}

/// External reward ledger.
///
/// Must be an upsert keyed by `(node_id, slot)` so republishing a slot is
/// harmless.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    async fn record_settlement(
        &self,
        node_id: &NodeId,
        slot: Slot,
        reward_amount: u64,
    ) -> Result<(), String>;
}

/// Event bus for proof and settlement notifications
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: LucidEvent) -> Result<(), String>;
}

/// Time source
pub trait TimeSource: Send + Sync {
    /// Current unix timestamp in seconds
    fn now(&self) -> u64;
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        shared_types::unix_now()
    }
}
