//! # Session Pipeline Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! lc-01-session-pipeline = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `pipeline_chunks_sealed_total` - Chunks compressed, encrypted and stored
//! - `pipeline_chunk_bytes_total` - Plaintext bytes accepted
//! - `pipeline_sessions_finished_total` - Sessions reaching a terminal state (by status)
//! - `pipeline_key_rotations_total` - Session key rotations
//! - `pipeline_merkle_build_seconds` - Merkle root build time

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref CHUNKS_SEALED: IntCounter = register_int_counter!(
        "pipeline_chunks_sealed_total",
        "Chunks compressed, encrypted and stored"
    )
    .expect("Failed to create CHUNKS_SEALED metric");

    pub static ref CHUNK_BYTES: IntCounter = register_int_counter!(
        "pipeline_chunk_bytes_total",
        "Plaintext bytes accepted into sessions"
    )
    .expect("Failed to create CHUNK_BYTES metric");

    pub static ref SESSIONS_FINISHED: IntCounterVec = register_int_counter_vec!(
        "pipeline_sessions_finished_total",
        "Sessions reaching a terminal state",
        &["status"]
    )
    .expect("Failed to create SESSIONS_FINISHED metric");

    pub static ref KEY_ROTATIONS: IntCounter = register_int_counter!(
        "pipeline_key_rotations_total",
        "Session key rotations"
    )
    .expect("Failed to create KEY_ROTATIONS metric");

    pub static ref MERKLE_BUILD: Histogram = register_histogram!(
        "pipeline_merkle_build_seconds",
        "Time taken to build a session Merkle root",
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    )
    .expect("Failed to create MERKLE_BUILD metric");
}

#[cfg(feature = "metrics")]
pub fn record_chunk_sealed(plaintext_bytes: u64) {
    CHUNKS_SEALED.inc();
    CHUNK_BYTES.inc_by(plaintext_bytes);
}

#[cfg(feature = "metrics")]
pub fn record_session_finished(status: &str) {
    SESSIONS_FINISHED.with_label_values(&[status]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_key_rotation() {
    KEY_ROTATIONS.inc();
}

#[cfg(feature = "metrics")]
pub fn record_merkle_build(seconds: f64) {
    MERKLE_BUILD.observe(seconds);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_chunk_sealed(_plaintext_bytes: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_session_finished(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_key_rotation() {}

#[cfg(not(feature = "metrics"))]
pub fn record_merkle_build(_seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_chunk_sealed(1024);
        record_session_finished("completed");
        record_key_rotation();
        record_merkle_build(0.01);
    }
}
