//! Domain layer for PoOT consensus.

pub mod config;
pub mod errors;
pub mod nonce_cache;
pub mod proof;
pub mod settlement;
pub mod slot;
pub mod trust;
pub mod weighting;

pub use config::PootConfig;
pub use errors::{
    DuplicateProofError, LateProofError, PootConfigError, ProofSubmissionError,
    ProofValidationError, SettlementError,
};
pub use nonce_cache::NonceCache;
pub use proof::{
    beacon_message, proof_message, root_message, ProofData, ProofSubmission, WorkProof,
};
pub use settlement::{
    compute_settlement, share, tally_balances, NodeBalance, ProofReward, SettlementRecord,
};
pub use slot::SlotClock;
pub use trust::{
    Condition, PermissionType, ResourceType, RuleAction, TrustPolicy, TrustRecord, TrustRule,
};
pub use weighting::{DefaultWeighting, RewardWeighting};
