//! # lc-03-poot-consensus
//!
//! Proof of Operational Time: collects signed work proofs per slot,
//! validates them, and settles each finished slot into rewards.
//!
//! ## Architecture
//!
//! ```text
//! node ──→ submit_proof ──→ PootService ──→ ProofStore (unique per node, slot, type)
//!                               │
//! SettlementScheduler ──→ settle_due ──→ compute_settlement ──→ RewardLedger
//!                                               │
//!                                           event bus
//! ```
//!
//! ## Proof Types
//!
//! | Type | Evidence |
//! |------|----------|
//! | relay_bandwidth | bytes and sessions relayed |
//! | storage_availability | chunk hash plus Merkle path to the session root |
//! | validation_signature | signature over a session's Merkle root |
//! | uptime_beacon | signed, time-bounded nonce |
//!
//! ## Guarantees
//!
//! - at most one proof per `(node_id, slot, proof_type)`; repeats return
//!   `DuplicateProofError` without side effects
//! - proofs for closed slots return `LateProofError` and are never stored
//! - settling a slot twice leaves the ledger unchanged

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{
    InMemoryIdentityRegistry, InMemoryProofStore, InMemoryRewardLedger, RecordingEventBus,
    SharedBusAdapter, StaticSessionRoots,
};
pub use domain::{
    DefaultWeighting, DuplicateProofError, LateProofError, NodeBalance, PootConfig,
    PootConfigError, ProofData, ProofSubmission, ProofSubmissionError, ProofValidationError,
    RewardWeighting, SettlementError, SettlementRecord, SlotClock, TrustPolicy, TrustRecord,
    WorkProof,
};
pub use ports::{
    EventBus, InsertOutcome, NodeIdentityRegistry, PootApi, ProofStore, RewardLedger,
    SessionRoot, SessionRootLookup, SystemTimeSource, TimeSource, TrustStore,
};
pub use service::{PootDependencies, PootService, SchedulerStats, SettlementScheduler};
