//! PoOT Service
//!
//! ## Proof Admission
//!
//! Checks run cheapest first and stop at the first failure:
//!
//! 1. trust policy allows the node to submit
//! 2. slot has started and is not closed
//! 3. no proof stored under the same `(node_id, slot, proof_type)`
//! 4. node signature over the proof message
//! 5. payload checks for the proof type (inclusion path, root signature,
//!    beacon window, nonce replay)
//! 6. atomic insert, which re-checks uniqueness and slot closure
//!
//! Validation failures add a soft penalty to the node's trust record.
//! Duplicates and late proofs do not.
//!
//! ## Settlement
//!
//! A slot is settled once, after it ends. The record is committed before
//! any ledger write; a ledger failure leaves it unpublished and the next
//! sweep republishes the same amounts.

mod scheduler;

pub use scheduler::{SchedulerStats, SettlementScheduler};

use crate::domain::{
    beacon_message, compute_settlement, proof_message, root_message, tally_balances,
    DuplicateProofError, LateProofError, NodeBalance, NonceCache, PootConfig, PootConfigError,
    ProofData, ProofSubmission, ProofSubmissionError, ProofValidationError, RewardWeighting,
    SettlementError, SettlementRecord, SlotClock, TrustRecord, WorkProof,
};
use crate::metrics;
use crate::ports::{
    EventBus, InsertOutcome, NodeIdentityRegistry, PootApi, ProofStore, RewardLedger,
    SessionRoot, SessionRootLookup, SystemTimeSource, TimeSource, TrustStore,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::LucidEvent;
use shared_crypto::{merkle::verify_proof, verify_ed25519};
use shared_types::{ChunkRecord, NodeId, ProofKey, SessionId, Slot, StoreError};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dependencies for the PoOT service
pub struct PootDependencies<S, I, R, L, E> {
    /// Proof, settlement and trust documents.
    pub store: Arc<S>,
    pub identity: Arc<I>,
    pub session_roots: Arc<R>,
    pub ledger: Arc<L>,
    pub event_bus: Arc<E>,
    pub config: PootConfig,
}

/// Proof collector, validator and slot settlement.
pub struct PootService<S, I, R, L, E>
where
    S: ProofStore + TrustStore,
    I: NodeIdentityRegistry,
    R: SessionRootLookup,
    L: RewardLedger,
    E: EventBus,
{
    store: Arc<S>,
    identity: Arc<I>,
    session_roots: Arc<R>,
    ledger: Arc<L>,
    event_bus: Arc<E>,
    config: PootConfig,
    clock: SlotClock,
    weighting: Arc<dyn RewardWeighting>,
    time_source: Arc<dyn TimeSource>,
    nonces: Mutex<NonceCache>,
    /// Serialises trust record read-modify-write.
    trust_lock: tokio::sync::Mutex<()>,
    /// One settlement at a time.
    settle_lock: tokio::sync::Mutex<()>,
}

impl<S, I, R, L, E> PootService<S, I, R, L, E>
where
    S: ProofStore + TrustStore,
    I: NodeIdentityRegistry,
    R: SessionRootLookup,
    L: RewardLedger,
    E: EventBus,
{
    pub fn new(deps: PootDependencies<S, I, R, L, E>) -> Result<Self, PootConfigError> {
        deps.config.validate()?;
        Ok(Self {
            store: deps.store,
            identity: deps.identity,
            session_roots: deps.session_roots,
            ledger: deps.ledger,
            event_bus: deps.event_bus,
            clock: deps.config.slot_clock(),
            weighting: Arc::new(deps.config.weighting()),
            config: deps.config,
            time_source: Arc::new(SystemTimeSource),
            nonces: Mutex::new(NonceCache::new()),
            trust_lock: tokio::sync::Mutex::new(()),
            settle_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the time source (for testing)
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Replace the default credit formulas.
    pub fn with_weighting(mut self, weighting: Arc<dyn RewardWeighting>) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn config(&self) -> &PootConfig {
        &self.config
    }

    async fn with_timeout<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.config.store_timeout;
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(limit.as_millis() as u64)),
        }
    }

    async fn publish(&self, event: LucidEvent) {
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(error = %e, "Failed to publish PoOT event");
        }
    }

    async fn load_trust(&self, node_id: &NodeId) -> Result<TrustRecord, StoreError> {
        Ok(self
            .with_timeout(self.store.load_trust(node_id))
            .await?
            .unwrap_or_else(|| TrustRecord::new(node_id.clone())))
    }

    async fn update_trust(&self, node_id: &NodeId, apply: impl FnOnce(&mut TrustRecord) + Send) {
        let _guard = self.trust_lock.lock().await;
        let mut record = match self.load_trust(node_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(node_id = %node_id, error = %e, "Failed to load trust record");
                return;
            }
        };
        apply(&mut record);
        if let Err(e) = self.with_timeout(self.store.save_trust(&record)).await {
            warn!(node_id = %node_id, error = %e, "Failed to save trust record");
        }
    }

    async fn session_root(
        &self,
        session_id: SessionId,
    ) -> Result<SessionRoot, ProofSubmissionError> {
        self.with_timeout(self.session_roots.session_root(session_id))
            .await?
            .ok_or_else(|| ProofValidationError::UnknownSession(session_id).into())
    }

    /// Run every check and store the proof.
    async fn admit(&self, submission: ProofSubmission, now: u64) -> Result<(), ProofSubmissionError> {
        let node_id = submission.node_id.clone();
        let slot = submission.slot;
        let proof_type = submission.proof_type();

        let trust = self.load_trust(&node_id).await?;
        if !self.config.trust.may_submit(&trust, proof_type) {
            return Err(ProofValidationError::Denied(node_id).into());
        }

        let current = self.clock.slot_at(now);
        if slot > current {
            return Err(ProofValidationError::FutureSlot { slot, current }.into());
        }
        if self.with_timeout(self.store.is_slot_closed(slot)).await? {
            return Err(LateProofError { slot }.into());
        }
        let key = submission.key();
        if self
            .with_timeout(self.store.load_proof(&key))
            .await?
            .is_some()
        {
            return Err(DuplicateProofError(key).into());
        }

        let public_key = self
            .with_timeout(self.identity.get_public_key(&node_id))
            .await?
            .ok_or_else(|| ProofValidationError::UnknownNode(node_id.clone()))?;
        let digest = proof_message(&node_id, slot, &submission.proof_data).map_err(|e| {
            ProofValidationError::Malformed {
                proof_type,
                reason: e.to_string(),
            }
        })?;
        verify_ed25519(&public_key, &digest, &submission.signature)
            .map_err(|_| ProofValidationError::InvalidSignature(node_id.clone()))?;

        self.check_payload(&node_id, &public_key, &submission.proof_data, now)
            .await?;

        let proof = WorkProof::verified(submission);
        match self.with_timeout(self.store.insert_if_absent(&proof)).await? {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Duplicate => Err(DuplicateProofError(key).into()),
            InsertOutcome::SlotClosed => Err(LateProofError { slot }.into()),
        }
    }

    async fn check_payload(
        &self,
        node_id: &NodeId,
        public_key: &[u8; 32],
        data: &ProofData,
        now: u64,
    ) -> Result<(), ProofSubmissionError> {
        let malformed = |reason: &str| ProofValidationError::Malformed {
            proof_type: data.proof_type(),
            reason: reason.to_string(),
        };

        match data {
            ProofData::RelayBandwidth {
                bytes_relayed,
                sessions_relayed,
            } => {
                if *bytes_relayed == 0 && *sessions_relayed == 0 {
                    return Err(malformed("no relayed traffic").into());
                }
            }
            ProofData::StorageAvailability {
                session_id,
                chunk_id,
                chunk_index,
                chunk_hash,
                bytes_stored,
                path,
            } => {
                if *bytes_stored == 0 {
                    return Err(malformed("no bytes stored").into());
                }
                if *chunk_id != ChunkRecord::make_id(session_id, *chunk_index) {
                    return Err(malformed("chunk id does not match session and index").into());
                }
                let root = self.session_root(*session_id).await?;
                // Past the last leaf a path can still reach the root through
                // the duplicated last node
                if *chunk_index >= root.chunk_count
                    || !verify_proof(chunk_hash, *chunk_index, path, &root.merkle_root)
                {
                    return Err(ProofValidationError::InclusionProofFailed {
                        session_id: *session_id,
                        chunk_index: *chunk_index,
                    }
                    .into());
                }
            }
            ProofData::ValidationSignature {
                session_id,
                merkle_root,
                root_signature,
                sessions_validated,
            } => {
                if *sessions_validated == 0 {
                    return Err(malformed("no sessions validated").into());
                }
                let root = self.session_root(*session_id).await?.merkle_root;
                if root != *merkle_root {
                    return Err(ProofValidationError::RootMismatch(*session_id).into());
                }
                verify_ed25519(public_key, &root_message(session_id, merkle_root), root_signature)
                    .map_err(|_| ProofValidationError::InvalidRootSignature(*session_id))?;
            }
            ProofData::UptimeBeacon {
                nonce,
                issued_at,
                expires_at,
                beacon_signature,
                ..
            } => {
                if expires_at < issued_at {
                    return Err(malformed("beacon expires before it is issued").into());
                }
                let lifetime = expires_at - issued_at;
                let max = self.config.beacon_window_secs;
                if lifetime > max {
                    return Err(ProofValidationError::BeaconTooLong { lifetime, max }.into());
                }
                if now < *issued_at || now > *expires_at {
                    return Err(ProofValidationError::BeaconOutsideWindow {
                        issued_at: *issued_at,
                        expires_at: *expires_at,
                        now,
                    }
                    .into());
                }
                let message = beacon_message(node_id, nonce, *issued_at, *expires_at);
                verify_ed25519(public_key, &message, beacon_signature)
                    .map_err(|_| ProofValidationError::InvalidBeaconSignature(node_id.clone()))?;
                // Last check: a nonce is only spent by an otherwise valid beacon
                if !self.nonces.lock().check_and_insert(*nonce, *expires_at, now) {
                    return Err(ProofValidationError::NonceReplayed.into());
                }
            }
        }
        Ok(())
    }

    /// Nodes whose trust records bar them from rewards.
    async fn barred_nodes(&self, proofs: &[WorkProof]) -> Result<HashSet<NodeId>, StoreError> {
        let nodes: BTreeSet<&NodeId> = proofs.iter().map(|p| &p.node_id).collect();
        let mut barred = HashSet::new();
        for node_id in nodes {
            let record = self.load_trust(node_id).await?;
            if !self.config.trust.may_receive(&record) {
                barred.insert(node_id.clone());
            }
        }
        Ok(barred)
    }

    async fn settle_locked(&self, slot: Slot) -> Result<SettlementRecord, SettlementError> {
        let current = self.current_slot();
        if slot >= current {
            return Err(SettlementError::SlotOpen { slot, current });
        }

        if let Some(existing) = self.with_timeout(self.store.load_settlement(slot)).await? {
            if existing.published {
                debug!(slot, "Slot already settled");
                return Ok(existing);
            }
            info!(slot, "Republishing unpublished settlement");
            return self.publish_settlement(existing).await;
        }

        self.with_timeout(self.store.close_slot(slot)).await?;
        let proofs = self.with_timeout(self.store.verified_proofs(slot)).await?;
        let barred = self.barred_nodes(&proofs).await?;
        for node_id in &barred {
            warn!(node_id = %node_id, slot, "Node barred from rewards by trust policy");
        }

        let record = compute_settlement(
            slot,
            self.config.slot_reward_pool,
            &proofs,
            self.weighting.as_ref(),
            |node_id| !barred.contains(node_id),
            self.time_source.now(),
        );
        let record = self
            .with_timeout(self.store.commit_settlement(&record))
            .await?;
        if record.published {
            return Ok(record);
        }
        self.publish_settlement(record).await
    }

    async fn publish_settlement(
        &self,
        mut record: SettlementRecord,
    ) -> Result<SettlementRecord, SettlementError> {
        let slot = record.slot;
        let limit = self.config.store_timeout;
        for entry in &record.entries {
            let write = self
                .ledger
                .record_settlement(&entry.node_id, slot, entry.reward_amount);
            let reason = match tokio::time::timeout(limit, write).await {
                Ok(Ok(())) => continue,
                Ok(Err(reason)) => reason,
                Err(_) => format!("timed out after {}ms", limit.as_millis()),
            };
            warn!(slot, node_id = %entry.node_id, reason = %reason, "Reward ledger write failed");
            return Err(SettlementError::Ledger { slot, reason });
        }

        self.with_timeout(self.store.mark_published(slot)).await?;
        record.published = true;

        info!(
            slot,
            total_credits = record.total_credits,
            distributed = record.distributed(),
            nodes = record.entries.len(),
            "Slot settled"
        );
        metrics::record_slot_settled(record.total_credits);
        self.publish(LucidEvent::SlotSettled {
            slot,
            total_credits: record.total_credits,
            entries: record.entries.clone(),
        })
        .await;
        Ok(record)
    }
}

#[async_trait]
impl<S, I, R, L, E> PootApi for PootService<S, I, R, L, E>
where
    S: ProofStore + TrustStore,
    I: NodeIdentityRegistry,
    R: SessionRootLookup,
    L: RewardLedger,
    E: EventBus,
{
    async fn submit_proof(
        &self,
        submission: ProofSubmission,
    ) -> Result<ProofKey, ProofSubmissionError> {
        let key = submission.key();
        let now = self.time_source.now();
        let result = self.admit(submission, now).await;

        match &result {
            Ok(()) => {
                info!(node_id = %key.node_id, slot = key.slot, proof_type = %key.proof_type, "Proof accepted");
                self.update_trust(&key.node_id, TrustRecord::record_acceptance)
                    .await;
                metrics::record_proof_accepted(key.proof_type.as_str());
                self.publish(LucidEvent::ProofAccepted(key.clone())).await;
            }
            Err(ProofSubmissionError::Validation(e)) => {
                warn!(node_id = %key.node_id, slot = key.slot, proof_type = %key.proof_type, error = %e, "Proof rejected");
                if e.is_penalised() {
                    let penalty = self.config.trust.rejection_penalty;
                    self.update_trust(&key.node_id, |record| record.record_rejection(penalty))
                        .await;
                }
                metrics::record_proof_rejected(e.reason());
                self.publish(LucidEvent::ProofRejected {
                    node_id: key.node_id.clone(),
                    slot: key.slot,
                    proof_type: key.proof_type,
                    reason: e.reason().to_string(),
                })
                .await;
            }
            Err(ProofSubmissionError::Duplicate(_)) => {
                debug!(proof = %key.document_id(), "Duplicate proof ignored");
                metrics::record_proof_rejected("duplicate");
            }
            Err(ProofSubmissionError::Late(_)) => {
                debug!(proof = %key.document_id(), "Late proof ignored");
                metrics::record_proof_rejected("late");
            }
            Err(ProofSubmissionError::Store(e)) => {
                warn!(proof = %key.document_id(), error = %e, "Proof not judged, store unavailable");
            }
        }

        result.map(|()| key)
    }

    async fn close_slot(&self, slot: Slot) -> Result<(), StoreError> {
        self.with_timeout(self.store.close_slot(slot)).await?;
        debug!(slot, "Slot closed");
        Ok(())
    }

    async fn settle_slot(&self, slot: Slot) -> Result<SettlementRecord, SettlementError> {
        let _guard = self.settle_lock.lock().await;
        self.settle_locked(slot).await
    }

    async fn settle_due(&self) -> Vec<Result<SettlementRecord, SettlementError>> {
        let now = self.time_source.now();
        let purged = self.nonces.lock().purge(now);
        if purged > 0 {
            debug!(purged, "Expired beacon nonces purged");
        }

        let current = self.clock.slot_at(now);
        if current == 0 {
            return Vec::new();
        }

        let mut due: BTreeSet<Slot> = BTreeSet::new();
        due.insert(current - 1);
        match self
            .with_timeout(self.store.unsettled_slots_before(current))
            .await
        {
            Ok(slots) => due.extend(slots),
            Err(e) => return vec![Err(e.into())],
        }
        match self.with_timeout(self.store.unpublished_settlements()).await {
            Ok(records) => due.extend(records.iter().map(|r| r.slot)),
            Err(e) => return vec![Err(e.into())],
        }

        let mut results = Vec::with_capacity(due.len());
        for slot in due {
            results.push(self.settle_slot(slot).await);
        }
        results
    }

    async fn get_proof(&self, key: &ProofKey) -> Result<Option<WorkProof>, StoreError> {
        self.with_timeout(self.store.load_proof(key)).await
    }

    async fn trust_record(&self, node_id: &NodeId) -> Result<TrustRecord, StoreError> {
        self.load_trust(node_id).await
    }

    async fn settlement(&self, slot: Slot) -> Result<Option<SettlementRecord>, StoreError> {
        self.with_timeout(self.store.load_settlement(slot)).await
    }

    async fn node_balance(&self, node_id: &NodeId) -> Result<NodeBalance, StoreError> {
        let records = self.with_timeout(self.store.settlements()).await?;
        Ok(tally_balances(&records)
            .into_iter()
            .find(|b| &b.node_id == node_id)
            .unwrap_or_else(|| NodeBalance::empty(node_id.clone())))
    }

    async fn ranking(&self, limit: usize) -> Result<Vec<NodeBalance>, StoreError> {
        let records = self.with_timeout(self.store.settlements()).await?;
        let mut ranked = tally_balances(&records);
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn current_slot(&self) -> Slot {
        self.clock.slot_at(self.time_source.now())
    }
}
