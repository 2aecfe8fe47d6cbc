//! Driving ports (Inbound API)

use crate::domain::{
    NodeBalance, ProofSubmission, ProofSubmissionError, SettlementError, SettlementRecord,
    TrustRecord, WorkProof,
};
use async_trait::async_trait;
use shared_types::{NodeId, ProofKey, Slot, StoreError};

/// Proof collection and settlement API.
#[async_trait]
pub trait PootApi: Send + Sync {
    /// Validate and store one proof.
    ///
    /// Duplicates and late proofs are reported but not penalised.
    async fn submit_proof(&self, submission: ProofSubmission)
        -> Result<ProofKey, ProofSubmissionError>;

    /// Stop accepting proofs for `slot`.
    async fn close_slot(&self, slot: Slot) -> Result<(), StoreError>;

    /// Settle a finished slot. Re-running returns the stored record.
    async fn settle_slot(&self, slot: Slot) -> Result<SettlementRecord, SettlementError>;

    /// Settle every finished slot that still needs it and republish
    /// records the ledger has not acknowledged.
    async fn settle_due(&self) -> Vec<Result<SettlementRecord, SettlementError>>;

    async fn get_proof(&self, key: &ProofKey) -> Result<Option<WorkProof>, StoreError>;

    async fn trust_record(&self, node_id: &NodeId) -> Result<TrustRecord, StoreError>;

    async fn settlement(&self, slot: Slot) -> Result<Option<SettlementRecord>, StoreError>;

    /// Rewards `node_id` has earned over every settled slot. Zero for a
    /// node with no settled proofs.
    async fn node_balance(&self, node_id: &NodeId) -> Result<NodeBalance, StoreError>;

    /// Top `limit` nodes by total reward.
    async fn ranking(&self, limit: usize) -> Result<Vec<NodeBalance>, StoreError>;

    /// Slot containing the current time.
    fn current_slot(&self) -> Slot;
}
