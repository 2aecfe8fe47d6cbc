//! # Work Credit Settlement
//!
//! Converts a closed slot's verified proofs into rewards:
//!
//! 1. credits per proof from the weighting policy (zero for nodes the
//!    trust policy bars from rewards)
//! 2. `reward = floor(pool * proof_credits / slot_credits)`
//! 3. node totals are the sum of their proof rewards
//!
//! Flooring leaves rounding dust undistributed; the sum never exceeds the
//! pool. A slot with zero credits settles every proof to zero.
//!
//! The computation is pure and sorts its input, so the same proofs always
//! give the same record.

use super::proof::WorkProof;
use super::weighting::RewardWeighting;
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, ProofKey, SettlementEntry, Slot};
use std::collections::BTreeMap;

/// Credit and reward of one proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReward {
    pub key: ProofKey,
    pub credits: u64,
    pub reward_amount: u64,
}

/// Stored result of settling one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    #[serde(rename = "_id")]
    pub slot: Slot,
    pub pool: u64,
    pub total_credits: u64,
    pub proofs: Vec<ProofReward>,
    /// One entry per node, ordered by node id.
    pub entries: Vec<SettlementEntry>,
    pub settled_at: u64,
    /// Every entry reached the reward ledger.
    pub published: bool,
}

impl SettlementRecord {
    /// Total paid out; at most `pool`.
    pub fn distributed(&self) -> u64 {
        self.entries.iter().map(|e| e.reward_amount).sum()
    }

    pub fn reward_for(&self, node_id: &NodeId) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| &e.node_id == node_id)
            .map(|e| e.reward_amount)
    }
}

/// Rewards one node has earned across settled slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBalance {
    pub node_id: NodeId,
    pub total_reward: u64,
    /// Verified proofs that went through settlement, rewarded or not.
    pub proof_count: u64,
    pub slots_rewarded: u64,
}

impl NodeBalance {
    pub fn empty(node_id: NodeId) -> Self {
        Self {
            node_id,
            total_reward: 0,
            proof_count: 0,
            slots_rewarded: 0,
        }
    }
}

/// Per-node totals over `records`, highest reward first, ties by node id.
pub fn tally_balances(records: &[SettlementRecord]) -> Vec<NodeBalance> {
    let mut totals: BTreeMap<NodeId, NodeBalance> = BTreeMap::new();
    for record in records {
        for proof in &record.proofs {
            let balance = totals
                .entry(proof.key.node_id.clone())
                .or_insert_with(|| NodeBalance::empty(proof.key.node_id.clone()));
            balance.proof_count += 1;
        }
        for entry in &record.entries {
            if let Some(balance) = totals.get_mut(&entry.node_id) {
                balance.total_reward = balance.total_reward.saturating_add(entry.reward_amount);
                if entry.reward_amount > 0 {
                    balance.slots_rewarded += 1;
                }
            }
        }
    }
    let mut ranked: Vec<NodeBalance> = totals.into_values().collect();
    // Stable sort keeps node id order among equal rewards
    ranked.sort_by(|a, b| b.total_reward.cmp(&a.total_reward));
    ranked
}

/// `floor(pool * credits / total)` without overflow.
pub fn share(pool: u64, credits: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (u128::from(pool) * u128::from(credits) / u128::from(total)) as u64
}

/// Settle `slot` over its verified proofs.
pub fn compute_settlement(
    slot: Slot,
    pool: u64,
    proofs: &[WorkProof],
    weighting: &dyn RewardWeighting,
    eligible: impl Fn(&NodeId) -> bool,
    settled_at: u64,
) -> SettlementRecord {
    let mut ordered: Vec<&WorkProof> = proofs
        .iter()
        .filter(|p| p.verified && p.slot == slot)
        .collect();
    ordered.sort_by_key(|p| p.key());

    let credited: Vec<(ProofKey, u64)> = ordered
        .iter()
        .map(|p| {
            let credits = if eligible(&p.node_id) {
                weighting.credits(&p.proof_data)
            } else {
                0
            };
            (p.key(), credits)
        })
        .collect();

    let total_credits = credited
        .iter()
        .fold(0u64, |acc, (_, c)| acc.saturating_add(*c));

    let mut per_node: BTreeMap<NodeId, u64> = BTreeMap::new();
    let proofs: Vec<ProofReward> = credited
        .into_iter()
        .map(|(key, credits)| {
            let reward_amount = share(pool, credits, total_credits);
            *per_node.entry(key.node_id.clone()).or_insert(0) += reward_amount;
            ProofReward {
                key,
                credits,
                reward_amount,
            }
        })
        .collect();

    let entries = per_node
        .into_iter()
        .map(|(node_id, reward_amount)| SettlementEntry {
            node_id,
            slot,
            reward_amount,
        })
        .collect();

    SettlementRecord {
        slot,
        pool,
        total_credits,
        proofs,
        entries,
        settled_at,
        published: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proof::{ProofData, ProofSubmission};
    use crate::domain::weighting::DefaultWeighting;

    fn proof(node: &str, slot: Slot, data: ProofData) -> WorkProof {
        WorkProof::verified(ProofSubmission {
            node_id: NodeId::new(node).unwrap(),
            slot,
            proof_data: data,
            signature: vec![0; 64],
            timestamp: 0,
        })
    }

    fn relay(sessions: u64) -> ProofData {
        ProofData::RelayBandwidth {
            bytes_relayed: 0,
            sessions_relayed: sessions,
        }
    }

    fn uptime(hours: u64) -> ProofData {
        ProofData::UptimeBeacon {
            nonce: [0; 32],
            issued_at: 0,
            expires_at: 0,
            uptime_seconds: hours * 3600,
            beacon_signature: vec![],
        }
    }

    fn settle(proofs: &[WorkProof], pool: u64) -> SettlementRecord {
        compute_settlement(50, pool, proofs, &DefaultWeighting::default(), |_| true, 0)
    }

    #[test]
    fn test_pro_rata_split() {
        let proofs = vec![
            proof("a", 50, relay(3)),
            proof("b", 50, relay(1)),
            proof("a", 50, uptime(4)),
        ];
        let record = settle(&proofs, 1_000);

        assert_eq!(record.total_credits, 8);
        assert_eq!(record.reward_for(&NodeId::new("a").unwrap()), Some(875));
        assert_eq!(record.reward_for(&NodeId::new("b").unwrap()), Some(125));
        assert_eq!(record.distributed(), 1_000);
    }

    #[test]
    fn test_floor_never_exceeds_pool() {
        let proofs = vec![
            proof("a", 50, relay(1)),
            proof("b", 50, relay(1)),
            proof("c", 50, relay(1)),
        ];
        let record = settle(&proofs, 100);
        assert!(record.entries.iter().all(|e| e.reward_amount == 33));
        assert_eq!(record.distributed(), 99);
    }

    #[test]
    fn test_zero_credit_slot() {
        let record = settle(&[proof("a", 50, uptime(0))], 1_000);
        assert_eq!(record.total_credits, 0);
        assert_eq!(record.distributed(), 0);
        assert_eq!(record.entries.len(), 1);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let mut proofs = vec![
            proof("b", 50, relay(2)),
            proof("a", 50, relay(5)),
            proof("c", 50, uptime(3)),
        ];
        let first = settle(&proofs, 777);
        proofs.reverse();
        assert_eq!(first, settle(&proofs, 777));
    }

    #[test]
    fn test_other_slots_and_ineligible_nodes_ignored() {
        let proofs = vec![
            proof("a", 50, relay(1)),
            proof("b", 50, relay(1)),
            proof("a", 49, relay(10)),
        ];
        let banned = NodeId::new("b").unwrap();
        let record = compute_settlement(
            50,
            100,
            &proofs,
            &DefaultWeighting::default(),
            |n| n != &banned,
            0,
        );
        assert_eq!(record.proofs.len(), 2);
        assert_eq!(record.reward_for(&NodeId::new("a").unwrap()), Some(100));
        assert_eq!(record.reward_for(&banned), Some(0));
    }

    #[test]
    fn test_balances_sum_across_slots() {
        let first = settle(
            &[
                proof("a", 50, relay(3)),
                proof("b", 50, relay(1)),
                proof("a", 50, uptime(4)),
            ],
            1_000,
        );
        let second = compute_settlement(
            51,
            100,
            &[
                proof("z", 51, uptime(0)),
                proof("c", 51, relay(1)),
                proof("b", 51, relay(1)),
            ],
            &DefaultWeighting::default(),
            |_| true,
            0,
        );

        let ranked = tally_balances(&[first, second]);
        let order: Vec<&str> = ranked.iter().map(|b| b.node_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "z"]);
        assert_eq!(ranked[0].total_reward, 875);
        assert_eq!(ranked[0].proof_count, 2);
        assert_eq!(ranked[0].slots_rewarded, 1);
        assert_eq!(ranked[1].total_reward, 175);
        assert_eq!(ranked[1].slots_rewarded, 2);

        // Settled with no credits: counted, never rewarded
        assert_eq!(ranked[3].total_reward, 0);
        assert_eq!(ranked[3].proof_count, 1);
        assert_eq!(ranked[3].slots_rewarded, 0);
    }

    #[test]
    fn test_share_overflow_safe() {
        assert_eq!(share(u64::MAX, u64::MAX, u64::MAX), u64::MAX);
        assert_eq!(share(10, 1, 0), 0);
    }
}
