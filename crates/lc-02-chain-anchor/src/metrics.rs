//! # Chain Anchor Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! lc-02-chain-anchor = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `anchor_submission_attempts_total` - Chain submission attempts
//! - `anchor_outcomes_total` - Finished anchoring runs (by outcome)
//! - `anchor_confirmation_polls_total` - Confirmation depth queries

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref SUBMISSION_ATTEMPTS: IntCounter = register_int_counter!(
        "anchor_submission_attempts_total",
        "Chain submission attempts"
    )
    .expect("Failed to create SUBMISSION_ATTEMPTS metric");

    pub static ref OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "anchor_outcomes_total",
        "Finished anchoring runs",
        &["outcome"]
    )
    .expect("Failed to create OUTCOMES metric");

    pub static ref CONFIRMATION_POLLS: IntCounter = register_int_counter!(
        "anchor_confirmation_polls_total",
        "Confirmation depth queries"
    )
    .expect("Failed to create CONFIRMATION_POLLS metric");
}

#[cfg(feature = "metrics")]
pub fn record_submission_attempt() {
    SUBMISSION_ATTEMPTS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_outcome(outcome: &str) {
    OUTCOMES.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_confirmation_poll() {
    CONFIRMATION_POLLS.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_submission_attempt() {}

#[cfg(not(feature = "metrics"))]
pub fn record_outcome(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_confirmation_poll() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_submission_attempt();
        record_outcome("confirmed");
        record_confirmation_poll();
    }
}
