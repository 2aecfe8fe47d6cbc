//! # Metrics Handler
//!
//! Folds bus events into the node-level Prometheus families of
//! `lucid-telemetry`. Subsystem crates keep their own finer metrics behind
//! their `metrics` feature.

use lucid_telemetry::{
    log_proof_event, log_session_event, metric_inc, ANCHOR_OUTCOMES, CHUNKS_APPENDED,
    MERKLE_BUILD_DURATION, PROOFS_SUBMITTED, SESSIONS_FINISHED, SLOTS_SETTLED,
};
use shared_bus::{EventFilter, EventSubscriber, LucidEvent, Subscription};
use tokio::sync::watch;
use tracing::info;

pub struct MetricsHandler {
    subscription: Subscription,
}

impl MetricsHandler {
    pub fn subscribe(bus: &impl EventSubscriber) -> Self {
        Self {
            subscription: bus.subscribe(EventFilter::all()),
        }
    }

    /// Run until `shutdown` flips to `true` or the bus closes. Returns the
    /// number of events observed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut observed = 0;
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                event = self.subscription.recv() => {
                    let Some(event) = event else { break };
                    observed += 1;
                    observe(&event);
                }
            }
        }
        info!(observed, "Metrics handler stopped");
        observed
    }
}

fn observe(event: &LucidEvent) {
    match event {
        LucidEvent::SessionCompleted {
            session_id,
            chunk_count,
            merkle_root,
            metadata,
        } => {
            metric_inc!(SESSIONS_FINISHED, &["completed"]);
            CHUNKS_APPENDED.inc_by(*chunk_count);
            MERKLE_BUILD_DURATION.observe(metadata.merkle_build_time_ms as f64 / 1000.0);
            log_session_event!(
                info,
                "lc-01",
                "Session completed",
                session_id,
                chunk_count = *chunk_count,
                merkle_root = %hex::encode(merkle_root)
            );
        }
        LucidEvent::SessionFailed { .. } => metric_inc!(SESSIONS_FINISHED, &["failed"]),
        LucidEvent::SessionCancelled {
            session_id,
            discarded_bytes,
        } => {
            metric_inc!(SESSIONS_FINISHED, &["cancelled"]);
            log_session_event!(
                debug,
                "lc-01",
                "Session cancelled",
                session_id,
                discarded_bytes = *discarded_bytes
            );
        }
        LucidEvent::AnchorConfirmed {
            session_id,
            txid,
            confirmations,
        } => {
            metric_inc!(ANCHOR_OUTCOMES, &["confirmed"]);
            log_session_event!(
                info,
                "lc-02",
                "Session root anchored",
                session_id,
                %txid,
                confirmations = *confirmations
            );
        }
        LucidEvent::AnchorPending { .. } => metric_inc!(ANCHOR_OUTCOMES, &["pending"]),
        LucidEvent::ProofAccepted(key) => {
            metric_inc!(PROOFS_SUBMITTED, &[key.proof_type.as_str(), "accepted"]);
        }
        LucidEvent::ProofRejected {
            node_id,
            slot,
            proof_type,
            reason,
        } => {
            metric_inc!(PROOFS_SUBMITTED, &[proof_type.as_str(), "rejected"]);
            log_proof_event!(debug, "lc-03", "Proof rejected", node_id, *slot, proof_type, %reason);
        }
        LucidEvent::SlotSettled {
            slot,
            total_credits,
            entries,
        } => {
            metric_inc!(SLOTS_SETTLED);
            info!(
                subsystem = "lc-03",
                slot = *slot,
                total_credits = *total_credits,
                nodes = entries.len(),
                "Slot settled"
            );
        }
        _ => {}
    }
}
