//! # Reward Weighting
//!
//! Turns one verified proof into work credits. The policy is a trait so a
//! network can swap formulas without touching settlement.
//!
//! ## Default Formulas
//!
//! | Proof type | Credits |
//! |------------|---------|
//! | relay_bandwidth | `max(sessions_relayed, ceil(MiB relayed / 5))` |
//! | storage_availability | `floor(10 * GiB stored) + 2` per chunk proof |
//! | validation_signature | `5 * sessions_validated` |
//! | uptime_beacon | `floor(uptime hours)` |
//!
//! Every result is capped at `max_credit_per_proof`.

use super::proof::ProofData;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// MiB of relayed traffic worth one credit.
pub const BASE_MB_PER_SESSION: u64 = 5;
pub const CREDITS_PER_GIB_STORED: u64 = 10;
pub const CREDITS_PER_CHUNK: u64 = 2;
pub const CREDITS_PER_VALIDATED_SESSION: u64 = 5;
pub const SECS_PER_UPTIME_CREDIT: u64 = 3600;

/// Per-proof credit policy.
pub trait RewardWeighting: Send + Sync {
    fn credits(&self, data: &ProofData) -> u64;
}

/// Default work-credit formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultWeighting {
    pub max_credit_per_proof: u64,
}

impl Default for DefaultWeighting {
    fn default() -> Self {
        Self {
            max_credit_per_proof: 10_000,
        }
    }
}

impl RewardWeighting for DefaultWeighting {
    fn credits(&self, data: &ProofData) -> u64 {
        let raw = match data {
            ProofData::RelayBandwidth {
                bytes_relayed,
                sessions_relayed,
            } => {
                let unit = BASE_MB_PER_SESSION * MIB;
                let bandwidth = bytes_relayed.div_ceil(unit);
                (*sessions_relayed).max(bandwidth)
            }
            ProofData::StorageAvailability { bytes_stored, .. } => {
                let capacity = (u128::from(*bytes_stored) * u128::from(CREDITS_PER_GIB_STORED)
                    / u128::from(GIB)) as u64;
                capacity.saturating_add(CREDITS_PER_CHUNK)
            }
            ProofData::ValidationSignature {
                sessions_validated, ..
            } => sessions_validated.saturating_mul(CREDITS_PER_VALIDATED_SESSION),
            ProofData::UptimeBeacon { uptime_seconds, .. } => uptime_seconds / SECS_PER_UPTIME_CREDIT,
        };
        raw.min(self.max_credit_per_proof)
    }
}
