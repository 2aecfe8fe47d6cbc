//! # PoOT Consensus Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! lc-03-poot-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `poot_proofs_accepted_total` - Stored proofs (by proof type)
//! - `poot_proofs_rejected_total` - Rejected proofs (by reason)
//! - `poot_slots_settled_total` - Slots settled and published
//! - `poot_slot_credits` - Total credits of the last settled slot

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref PROOFS_ACCEPTED: IntCounterVec = register_int_counter_vec!(
        "poot_proofs_accepted_total",
        "Stored proofs",
        &["proof_type"]
    )
    .expect("Failed to create PROOFS_ACCEPTED metric");

    pub static ref PROOFS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "poot_proofs_rejected_total",
        "Rejected proofs",
        &["reason"]
    )
    .expect("Failed to create PROOFS_REJECTED metric");

    pub static ref SLOTS_SETTLED: IntCounter = register_int_counter!(
        "poot_slots_settled_total",
        "Slots settled and published"
    )
    .expect("Failed to create SLOTS_SETTLED metric");

    pub static ref SLOT_CREDITS: IntGauge = register_int_gauge!(
        "poot_slot_credits",
        "Total credits of the last settled slot"
    )
    .expect("Failed to create SLOT_CREDITS metric");
}

#[cfg(feature = "metrics")]
pub fn record_proof_accepted(proof_type: &str) {
    PROOFS_ACCEPTED.with_label_values(&[proof_type]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_proof_rejected(reason: &str) {
    PROOFS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_slot_settled(total_credits: u64) {
    SLOTS_SETTLED.inc();
    SLOT_CREDITS.set(total_credits.min(i64::MAX as u64) as i64);
}

#[cfg(not(feature = "metrics"))]
pub fn record_proof_accepted(_proof_type: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_proof_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_slot_settled(_total_credits: u64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_proof_accepted("uptime_beacon");
        record_proof_rejected("duplicate");
        record_slot_settled(42);
    }
}
