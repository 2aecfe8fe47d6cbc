//! In-memory adapters
//!
//! Proof, trust and settlement documents plus the identity, session-root
//! and ledger collaborators, kept in process memory. Used by tests and by
//! single-node deployments.

use crate::domain::{SettlementRecord, TrustRecord, WorkProof};
use crate::ports::{
    InsertOutcome, NodeIdentityRegistry, ProofStore, RewardLedger, SessionRoot, SessionRootLookup,
    TrustStore,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{Hash, NodeId, ProofKey, SessionId, Slot, StoreError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
struct ProofState {
    proofs: BTreeMap<ProofKey, WorkProof>,
    closed: BTreeSet<Slot>,
    settlements: BTreeMap<Slot, SettlementRecord>,
}

/// Proof, settlement and trust documents.
///
/// One lock covers proofs, closed slots and settlements, so inserts and
/// settlement commits are serialised.
#[derive(Default)]
pub struct InMemoryProofStore {
    state: Mutex<ProofState>,
    trust: RwLock<HashMap<NodeId, TrustRecord>>,
}

impl InMemoryProofStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proof_count(&self) -> usize {
        self.state.lock().proofs.len()
    }

    pub fn settlement_count(&self) -> usize {
        self.state.lock().settlements.len()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn insert_if_absent(&self, proof: &WorkProof) -> Result<InsertOutcome, StoreError> {
        let mut state = self.state.lock();
        if state.closed.contains(&proof.slot) {
            return Ok(InsertOutcome::SlotClosed);
        }
        let key = proof.key();
        if state.proofs.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        state.proofs.insert(key, proof.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn load_proof(&self, key: &ProofKey) -> Result<Option<WorkProof>, StoreError> {
        Ok(self.state.lock().proofs.get(key).cloned())
    }

    async fn close_slot(&self, slot: Slot) -> Result<(), StoreError> {
        self.state.lock().closed.insert(slot);
        Ok(())
    }

    async fn is_slot_closed(&self, slot: Slot) -> Result<bool, StoreError> {
        Ok(self.state.lock().closed.contains(&slot))
    }

    async fn verified_proofs(&self, slot: Slot) -> Result<Vec<WorkProof>, StoreError> {
        Ok(self
            .state
            .lock()
            .proofs
            .values()
            .filter(|p| p.slot == slot && p.verified)
            .cloned()
            .collect())
    }

    async fn commit_settlement(
        &self,
        record: &SettlementRecord,
    ) -> Result<SettlementRecord, StoreError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.settlements.get(&record.slot) {
            return Ok(existing.clone());
        }
        state.closed.insert(record.slot);
        for reward in &record.proofs {
            if let Some(proof) = state.proofs.get_mut(&reward.key) {
                if proof.reward_amount.is_none() {
                    proof.reward_amount = Some(reward.reward_amount);
                }
            }
        }
        state.settlements.insert(record.slot, record.clone());
        Ok(record.clone())
    }

    async fn load_settlement(&self, slot: Slot) -> Result<Option<SettlementRecord>, StoreError> {
        Ok(self.state.lock().settlements.get(&slot).cloned())
    }

    async fn mark_published(&self, slot: Slot) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let record = state
            .settlements
            .get_mut(&slot)
            .ok_or_else(|| StoreError::NotFound(format!("settlement {slot}")))?;
        record.published = true;
        Ok(())
    }

    async fn settlements(&self) -> Result<Vec<SettlementRecord>, StoreError> {
        Ok(self.state.lock().settlements.values().cloned().collect())
    }

    async fn unpublished_settlements(&self) -> Result<Vec<SettlementRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .settlements
            .values()
            .filter(|r| !r.published)
            .cloned()
            .collect())
    }

    async fn unsettled_slots_before(&self, current: Slot) -> Result<Vec<Slot>, StoreError> {
        let state = self.state.lock();
        let slots: BTreeSet<Slot> = state
            .proofs
            .values()
            .map(|p| p.slot)
            .filter(|slot| *slot < current && !state.settlements.contains_key(slot))
            .collect();
        Ok(slots.into_iter().collect())
    }
}

#[async_trait]
impl TrustStore for InMemoryProofStore {
    async fn load_trust(&self, node_id: &NodeId) -> Result<Option<TrustRecord>, StoreError> {
        Ok(self.trust.read().get(node_id).cloned())
    }

    async fn save_trust(&self, record: &TrustRecord) -> Result<(), StoreError> {
        self.trust
            .write()
            .insert(record.node_id.clone(), record.clone());
        Ok(())
    }
}

/// Registered node keys.
#[derive(Default)]
pub struct InMemoryIdentityRegistry {
    keys: RwLock<HashMap<NodeId, [u8; 32]>>,
}

impl InMemoryIdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, node_id: NodeId, public_key: [u8; 32]) {
        self.keys.write().insert(node_id, public_key);
    }
}

#[async_trait]
impl NodeIdentityRegistry for InMemoryIdentityRegistry {
    async fn get_public_key(&self, node_id: &NodeId) -> Result<Option<[u8; 32]>, StoreError> {
        Ok(self.keys.read().get(node_id).copied())
    }
}

/// Fixed session roots.
#[derive(Default)]
pub struct StaticSessionRoots {
    roots: RwLock<HashMap<SessionId, SessionRoot>>,
}

impl StaticSessionRoots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session_id: SessionId, merkle_root: Hash, chunk_count: u64) {
        self.roots.write().insert(
            session_id,
            SessionRoot {
                merkle_root,
                chunk_count,
            },
        );
    }
}

#[async_trait]
impl SessionRootLookup for StaticSessionRoots {
    async fn session_root(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionRoot>, StoreError> {
        Ok(self.roots.read().get(&session_id).copied())
    }
}

/// Reward ledger keyed by `(node_id, slot)`.
#[derive(Default)]
pub struct InMemoryRewardLedger {
    entries: RwLock<BTreeMap<(NodeId, Slot), u64>>,
    writes: AtomicU64,
    failing: AtomicBool,
}

impl InMemoryRewardLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn amount(&self, node_id: &NodeId, slot: Slot) -> Option<u64> {
        self.entries.read().get(&(node_id.clone(), slot)).copied()
    }

    /// Sum over all slots for one node.
    pub fn balance(&self, node_id: &NodeId) -> u64 {
        self.entries
            .read()
            .iter()
            .filter(|((node, _), _)| node == node_id)
            .map(|(_, amount)| *amount)
            .sum()
    }

    pub fn entries(&self) -> Vec<(NodeId, Slot, u64)> {
        self.entries
            .read()
            .iter()
            .map(|((node, slot), amount)| (node.clone(), *slot, *amount))
            .collect()
    }

    /// Successful writes, including overwrites.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RewardLedger for InMemoryRewardLedger {
    async fn record_settlement(
        &self,
        node_id: &NodeId,
        slot: Slot,
        reward_amount: u64,
    ) -> Result<(), String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("reward ledger unavailable".to_string());
        }
        self.entries
            .write()
            .insert((node_id.clone(), slot), reward_amount);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProofData, ProofSubmission};

    fn proof(node: &str, slot: Slot) -> WorkProof {
        WorkProof::verified(ProofSubmission {
            node_id: NodeId::new(node).unwrap(),
            slot,
            proof_data: ProofData::RelayBandwidth {
                bytes_relayed: 1,
                sessions_relayed: 1,
            },
            signature: vec![],
            timestamp: 0,
        })
    }

    fn record(slot: Slot, reward: u64) -> SettlementRecord {
        let p = proof("a", slot);
        SettlementRecord {
            slot,
            pool: 100,
            total_credits: 1,
            proofs: vec![crate::domain::ProofReward {
                key: p.key(),
                credits: 1,
                reward_amount: reward,
            }],
            entries: vec![],
            settled_at: 0,
            published: false,
        }
    }

    #[tokio::test]
    async fn test_insert_is_unique_per_key() {
        let store = InMemoryProofStore::new();
        assert_eq!(
            store.insert_if_absent(&proof("a", 1)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert_if_absent(&proof("a", 1)).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(
            store.insert_if_absent(&proof("a", 2)).await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(store.proof_count(), 2);
    }

    #[tokio::test]
    async fn test_closed_slot_refuses_inserts() {
        let store = InMemoryProofStore::new();
        store.close_slot(5).await.unwrap();
        assert_eq!(
            store.insert_if_absent(&proof("a", 5)).await.unwrap(),
            InsertOutcome::SlotClosed
        );
        assert_eq!(store.proof_count(), 0);
    }

    #[tokio::test]
    async fn test_first_commit_wins() {
        let store = InMemoryProofStore::new();
        let p = proof("a", 3);
        store.insert_if_absent(&p).await.unwrap();

        let first = store.commit_settlement(&record(3, 70)).await.unwrap();
        let second = store.commit_settlement(&record(3, 99)).await.unwrap();

        assert_eq!(first, second);
        let stored = store.load_proof(&p.key()).await.unwrap().unwrap();
        assert_eq!(stored.reward_amount, Some(70));
        assert!(store.is_slot_closed(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_unsettled_slots() {
        let store = InMemoryProofStore::new();
        for slot in [1, 2, 2, 4, 9] {
            let _ = store.insert_if_absent(&proof("a", slot)).await.unwrap();
        }
        store.commit_settlement(&record(2, 1)).await.unwrap();
        assert_eq!(store.unsettled_slots_before(9).await.unwrap(), vec![1, 4]);
    }

    #[tokio::test]
    async fn test_ledger_upserts() {
        let ledger = InMemoryRewardLedger::new();
        let node = NodeId::new("a").unwrap();
        ledger.record_settlement(&node, 1, 10).await.unwrap();
        ledger.record_settlement(&node, 1, 10).await.unwrap();
        ledger.record_settlement(&node, 2, 5).await.unwrap();
        assert_eq!(ledger.balance(&node), 15);
        assert_eq!(ledger.write_count(), 3);

        ledger.set_failing(true);
        assert!(ledger.record_settlement(&node, 3, 1).await.is_err());
        assert_eq!(ledger.amount(&node, 3), None);
    }
}
