//! Prometheus metrics for the Lucid node.
//!
//! Naming convention: `lucid_<area>_<metric>_<unit>`.
//! Subsystem crates keep their own fine-grained metrics behind a `metrics`
//! feature; the families here are the node-level view.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Node-wide metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Sessions reaching a terminal state, by status
    pub static ref SESSIONS_FINISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("lucid_sessions_finished_total", "Sessions reaching a terminal state"),
        &["status"]
    ).expect("metric creation failed");

    /// Pipelines currently running
    pub static ref ACTIVE_SESSIONS: IntGauge = IntGauge::new(
        "lucid_sessions_active",
        "Session pipelines currently running"
    ).expect("metric creation failed");

    /// Chunks appended across all sessions
    pub static ref CHUNKS_APPENDED: IntCounter = IntCounter::new(
        "lucid_chunks_appended_total",
        "Encrypted chunks appended to session records"
    ).expect("metric creation failed");

    /// Merkle build latency
    pub static ref MERKLE_BUILD_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "lucid_merkle_build_duration_seconds",
            "Time spent building session Merkle roots"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");

    // =========================================================================
    // ANCHORING
    // =========================================================================

    /// Anchor outcomes (confirmed, unconfirmed, pending)
    pub static ref ANCHOR_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("lucid_anchor_outcomes_total", "Anchor attempts by final outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // POOT
    // =========================================================================

    /// Proof submissions by type and result
    pub static ref PROOFS_SUBMITTED: IntCounterVec = IntCounterVec::new(
        Opts::new("lucid_poot_proofs_total", "Work proofs by type and result"),
        &["proof_type", "result"]
    ).expect("metric creation failed");

    /// Slots settled
    pub static ref SLOTS_SETTLED: IntCounter = IntCounter::new(
        "lucid_poot_slots_settled_total",
        "Slots settled and published to the reward ledger"
    ).expect("metric creation failed");

    /// Errors by subsystem and kind
    pub static ref SUBSYSTEM_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("lucid_subsystem_errors_total", "Errors by subsystem and type"),
        &["subsystem", "error_type"]
    ).expect("metric creation failed");
}

/// Handle proving registration happened.
#[derive(Debug)]
pub struct MetricsHandle {
    registered: usize,
}

impl MetricsHandle {
    /// Number of metric families registered.
    pub fn registered(&self) -> usize {
        self.registered
    }
}

/// Register all node metrics with [`REGISTRY`].
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SESSIONS_FINISHED.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
        Box::new(CHUNKS_APPENDED.clone()),
        Box::new(MERKLE_BUILD_DURATION.clone()),
        Box::new(ANCHOR_OUTCOMES.clone()),
        Box::new(PROOFS_SUBMITTED.clone()),
        Box::new(SLOTS_SETTLED.clone()),
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];
    let registered = metrics.len();

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { registered })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
