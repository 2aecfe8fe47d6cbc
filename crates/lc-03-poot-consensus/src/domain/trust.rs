//! # Node Trust Rules
//!
//! Rejected proofs accrue a soft penalty on the node's trust record.
//! Policies are lists of typed rules over that record; the first rule whose
//! resource, permission and condition all match decides.
//!
//! ## Default Policy
//!
//! | Resource | Permission | Condition | Action |
//! |----------|------------|-----------|--------|
//! | proofs | submit | penalty >= 20 | deny |
//! | rewards | receive | penalty >= 10 | deny |

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, ProofType};

/// What a rule guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Proofs,
    Rewards,
}

/// What the node is trying to do with the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Submit,
    Receive,
}

/// Predicate over a node's trust record and the proof at hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Always,
    PenaltyAtLeast { points: u32 },
    RejectionsAtLeast { count: u64 },
    ProofTypeIs { proof_type: ProofType },
    AllOf { conditions: Vec<Condition> },
}

impl Condition {
    pub fn holds(&self, record: &TrustRecord, proof_type: Option<ProofType>) -> bool {
        match self {
            Self::Always => true,
            Self::PenaltyAtLeast { points } => record.penalty >= *points,
            Self::RejectionsAtLeast { count } => record.rejected >= *count,
            Self::ProofTypeIs { proof_type: wanted } => proof_type == Some(*wanted),
            Self::AllOf { conditions } => conditions.iter().all(|c| c.holds(record, proof_type)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRule {
    pub resource_type: ResourceType,
    pub permission_type: PermissionType,
    pub condition: Condition,
    pub action: RuleAction,
}

/// Per-node trust state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    #[serde(rename = "_id")]
    pub node_id: NodeId,
    pub penalty: u32,
    pub accepted: u64,
    pub rejected: u64,
}

impl TrustRecord {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            penalty: 0,
            accepted: 0,
            rejected: 0,
        }
    }

    pub fn record_rejection(&mut self, penalty: u32) {
        self.rejected = self.rejected.saturating_add(1);
        self.penalty = self.penalty.saturating_add(penalty);
    }

    pub fn record_acceptance(&mut self) {
        self.accepted = self.accepted.saturating_add(1);
    }
}

/// Ordered rule list plus the penalty a rejection costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub rules: Vec<TrustRule>,
    pub rejection_penalty: u32,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                TrustRule {
                    resource_type: ResourceType::Proofs,
                    permission_type: PermissionType::Submit,
                    condition: Condition::PenaltyAtLeast { points: 20 },
                    action: RuleAction::Deny,
                },
                TrustRule {
                    resource_type: ResourceType::Rewards,
                    permission_type: PermissionType::Receive,
                    condition: Condition::PenaltyAtLeast { points: 10 },
                    action: RuleAction::Deny,
                },
            ],
            rejection_penalty: 1,
        }
    }
}

impl TrustPolicy {
    /// First matching rule's action; no match allows.
    pub fn evaluate(
        &self,
        resource_type: ResourceType,
        permission_type: PermissionType,
        record: &TrustRecord,
        proof_type: Option<ProofType>,
    ) -> RuleAction {
        self.rules
            .iter()
            .find(|rule| {
                rule.resource_type == resource_type
                    && rule.permission_type == permission_type
                    && rule.condition.holds(record, proof_type)
            })
            .map_or(RuleAction::Allow, |rule| rule.action)
    }

    pub fn may_submit(&self, record: &TrustRecord, proof_type: ProofType) -> bool {
        self.evaluate(ResourceType::Proofs, PermissionType::Submit, record, Some(proof_type))
            == RuleAction::Allow
    }

    pub fn may_receive(&self, record: &TrustRecord) -> bool {
        self.evaluate(ResourceType::Rewards, PermissionType::Receive, record, None)
            == RuleAction::Allow
    }
}
