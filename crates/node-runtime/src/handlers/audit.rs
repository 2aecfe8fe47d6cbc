//! # Audit Handler
//!
//! Consumes events that need an operator's attention:
//!
//! - `ManualAuditRequired` from the dead letter queue (Merkle input desync)
//! - `SessionFailed`
//! - `AnchorPending` (retry budget spent, root not on chain)
//!
//! Everything else on the subscribed topics is ignored.

use lucid_telemetry::SUBSYSTEM_ERRORS;
use shared_bus::{EventFilter, EventSubscriber, EventTopic, LucidEvent, Subscription};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Counts of what the handler saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub manual_audits: u64,
    pub failed_sessions: u64,
    pub pending_anchors: u64,
}

pub struct AuditHandler {
    subscription: Subscription,
}

impl AuditHandler {
    /// Subscribe now so nothing published before `run` is missed.
    pub fn subscribe(bus: &impl EventSubscriber) -> Self {
        let filter = EventFilter::topics(vec![
            EventTopic::DeadLetterQueue,
            EventTopic::Sessions,
            EventTopic::Anchoring,
        ]);
        Self {
            subscription: bus.subscribe(filter),
        }
    }

    /// Run until `shutdown` flips to `true` or the bus closes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> AuditStats {
        let mut stats = AuditStats::default();
        info!("Audit handler started");

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
                    record(&mut stats, event);
                }
            }
        }

        info!(?stats, "Audit handler stopped");
        stats
    }
}

fn record(stats: &mut AuditStats, event: LucidEvent) {
    match event {
        LucidEvent::ManualAuditRequired {
            source,
            session_id,
            reason,
        } => {
            stats.manual_audits += 1;
            SUBSYSTEM_ERRORS
                .with_label_values(&[&source.to_string(), "manual_audit"])
                .inc();
            error!(
                source_subsystem = source,
                session_id = ?session_id,
                %reason,
                "MANUAL AUDIT REQUIRED"
            );
        }
        LucidEvent::SessionFailed { session_id, reason } => {
            stats.failed_sessions += 1;
            warn!(%session_id, %reason, "Session failed");
        }
        LucidEvent::AnchorPending {
            session_id,
            attempts,
            last_error,
        } => {
            stats.pending_anchors += 1;
            warn!(%session_id, attempts, %last_error, "Session root not anchored");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventPublisher, InMemoryEventBus, SESSION_PIPELINE};
    use shared_types::SessionId;

    #[tokio::test]
    async fn test_counts_attention_events_only() {
        let bus = InMemoryEventBus::new();
        let handler = AuditHandler::subscribe(&bus);

        let session_id = SessionId::new();
        bus.publish(LucidEvent::SessionActive { session_id }).await;
        bus.publish(LucidEvent::ManualAuditRequired {
            source: SESSION_PIPELINE,
            session_id: Some(session_id),
            reason: "hash list length 3, chunk count 4".into(),
        })
        .await;
        bus.publish(LucidEvent::SessionFailed {
            session_id,
            reason: "merkle".into(),
        })
        .await;
        bus.publish(LucidEvent::AnchorPending {
            session_id: SessionId::new(),
            attempts: 3,
            last_error: "timeout".into(),
        })
        .await;
        bus.publish(LucidEvent::SlotSettled {
            slot: 4,
            total_credits: 0,
            entries: vec![],
        })
        .await;

        // Closing the bus ends the run once the backlog is drained
        drop(bus);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = handler.run(shutdown_rx).await;

        assert_eq!(
            stats,
            AuditStats {
                manual_audits: 1,
                failed_sessions: 1,
                pending_anchors: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let bus = InMemoryEventBus::new();
        let handler = AuditHandler::subscribe(&bus);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(handler.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        assert_eq!(task.await.unwrap(), AuditStats::default());
    }
}
