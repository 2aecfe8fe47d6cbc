//! # Node Runtime
//!
//! Owns the subsystem container and the background tasks around it:
//!
//! | Task | Purpose |
//! |------|---------|
//! | anchor worker | drains the anchor queue filled by the pipeline |
//! | settlement scheduler | settles each slot once it has ended |
//! | audit handler | surfaces failed sessions, pending anchors, manual audits |
//! | metrics handler | folds bus events into node metrics |
//! | key maintenance | purges expired session keys |
//!
//! All tasks watch one shutdown channel.

use crate::container::{ContainerError, NodeConfig, SubsystemContainer};
use crate::handlers::{AuditHandler, AuditStats, KeyMaintenance, MetricsHandler};
use lc_01_session_pipeline::SessionPipelineApi;
use lc_02_chain_anchor::{AnchorWorker, WorkerStats};
use lc_03_poot_consensus::{PootApi, SchedulerStats, SettlementScheduler};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("runtime already started")]
    AlreadyStarted,
}

/// What each task reported on shutdown. `None` when the task did not stop
/// within the grace period.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub anchor: Option<WorkerStats>,
    pub settlement: Option<SchedulerStats>,
    pub audit: Option<AuditStats>,
    pub events_observed: Option<u64>,
    pub keys_purged: Option<usize>,
}

#[derive(Default)]
struct Tasks {
    anchor: Option<JoinHandle<WorkerStats>>,
    settlement: Option<JoinHandle<SchedulerStats>>,
    audit: Option<JoinHandle<AuditStats>>,
    metrics: Option<JoinHandle<u64>>,
    keys: Option<JoinHandle<usize>>,
}

/// Main node runtime.
pub struct NodeRuntime {
    container: SubsystemContainer,
    shutdown_tx: watch::Sender<bool>,
    tasks: Tasks,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self, RuntimeError> {
        Ok(Self::with_container(SubsystemContainer::new(config)?))
    }

    pub fn with_container(container: SubsystemContainer) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            container,
            shutdown_tx,
            tasks: Tasks::default(),
        }
    }

    pub fn container(&self) -> &SubsystemContainer {
        &self.container
    }

    /// Restore session keys and spawn the background tasks.
    pub async fn start(&mut self) -> Result<(), RuntimeError> {
        let queue = self
            .container
            .take_anchor_queue()
            .ok_or(RuntimeError::AlreadyStarted)?;
        info!("Starting Lucid node");

        match self.container.pipeline.restore_keys().await {
            Ok(restored) => info!(restored, "Session keys restored"),
            Err(e) => warn!(error = %e, "Session key restore failed"),
        }

        // Subscribe before anything can publish
        let audit = AuditHandler::subscribe(self.container.event_bus.as_ref());
        let metrics = MetricsHandler::subscribe(self.container.event_bus.as_ref());
        self.tasks.audit = Some(tokio::spawn(audit.run(self.shutdown_tx.subscribe())));
        self.tasks.metrics = Some(tokio::spawn(metrics.run(self.shutdown_tx.subscribe())));

        let worker = AnchorWorker::new(self.container.anchor.clone());
        self.tasks.anchor = Some(tokio::spawn(worker.run(queue, self.shutdown_tx.subscribe())));

        let poot: Arc<dyn PootApi> = self.container.poot.clone();
        let period = Duration::from_secs(self.container.config.poot.slot_duration_secs);
        let scheduler = SettlementScheduler::new(poot, period);
        self.tasks.settlement = Some(tokio::spawn(scheduler.run(self.shutdown_tx.subscribe())));

        let keys = KeyMaintenance::new(
            self.container.pipeline.clone(),
            self.container.config.runtime.key_maintenance_period,
        );
        self.tasks.keys = Some(tokio::spawn(keys.run(self.shutdown_tx.subscribe())));

        info!(
            slot = self.container.poot.current_slot(),
            active_sessions = self.container.pipeline.active_session_count(),
            "Lucid node running"
        );
        Ok(())
    }

    /// Signal every task and wait up to the grace period for each.
    pub async fn shutdown(mut self) -> ShutdownReport {
        info!("Initiating graceful shutdown");
        // Receivers may all be gone already
        let _ = self.shutdown_tx.send(true);

        let grace = self.container.config.runtime.shutdown_grace;
        let report = ShutdownReport {
            anchor: join_within(self.tasks.anchor.take(), grace, "anchor worker").await,
            settlement: join_within(self.tasks.settlement.take(), grace, "settlement").await,
            audit: join_within(self.tasks.audit.take(), grace, "audit").await,
            events_observed: join_within(self.tasks.metrics.take(), grace, "metrics").await,
            keys_purged: join_within(self.tasks.keys.take(), grace, "key maintenance").await,
        };

        info!(?report, "Shutdown complete");
        report
    }
}

async fn join_within<T>(
    handle: Option<JoinHandle<T>>,
    grace: Duration,
    task: &'static str,
) -> Option<T> {
    let mut handle = handle?;
    match tokio::time::timeout(grace, &mut handle).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(task, error = %e, "Task ended abnormally");
            None
        }
        Err(_) => {
            warn!(task, "Task did not stop in time, aborting");
            handle.abort();
            None
        }
    }
}
