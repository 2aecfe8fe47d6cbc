//! Slot settlement timer.
//!
//! Sweeps once at start-up to catch up on slots that ended while the node
//! was down, then once per slot duration.

use crate::ports::PootApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Counters for one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub sweeps: u64,
    /// Slots settled, or found already settled.
    pub handled: u64,
    pub failed: u64,
}

pub struct SettlementScheduler {
    api: Arc<dyn PootApi>,
    period: Duration,
}

impl SettlementScheduler {
    pub fn new(api: Arc<dyn PootApi>, period: Duration) -> Self {
        Self { api, period }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = self.period.as_secs(), "Settlement scheduler started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    stats.sweeps += 1;
                    for result in self.api.settle_due().await {
                        match result {
                            Ok(record) => {
                                stats.handled += 1;
                                debug!(slot = record.slot, "Settlement sweep handled slot");
                            }
                            Err(e) => {
                                stats.failed += 1;
                                warn!(error = %e, "Settlement failed, retrying next sweep");
                            }
                        }
                    }
                }
            }
        }

        info!(?stats, "Settlement scheduler stopped");
        stats
    }
}
