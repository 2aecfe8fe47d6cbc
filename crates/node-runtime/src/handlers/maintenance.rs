//! Periodic session-key maintenance.
//!
//! Expired keys stay usable for decryption until this task purges them.
//! Each tick also refreshes the active-session gauge.

use crate::container::PipelineServiceImpl;
use lc_01_session_pipeline::SessionPipelineApi;
use lucid_telemetry::ACTIVE_SESSIONS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub struct KeyMaintenance {
    pipeline: Arc<PipelineServiceImpl>,
    period: Duration,
}

impl KeyMaintenance {
    pub fn new(pipeline: Arc<PipelineServiceImpl>, period: Duration) -> Self {
        Self { pipeline, period }
    }

    /// Run until `shutdown` flips to `true`. Returns the keys purged.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut purged_total = 0;
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    ACTIVE_SESSIONS.set(self.pipeline.active_session_count() as i64);
                    match self.pipeline.purge_expired_keys().await {
                        Ok(0) => {}
                        Ok(purged) => {
                            purged_total += purged;
                            info!(purged, "Expired session keys purged");
                        }
                        Err(e) => warn!(error = %e, "Key purge failed, retrying next tick"),
                    }
                }
            }
        }

        purged_total
    }
}
