//! Anchor worker.
//!
//! Drains the anchor request queue filled by the session pipeline. Each
//! request runs on its own task, at most `max_in_flight` at a time, so a
//! slow confirmation never holds up the next submission. Requests stay in
//! the queue until a slot frees up.

use super::AnchorService;
use crate::domain::AnchorOutcome;
use crate::ports::{AnchorClientApi, AnchorSink, ChainSubmitter, EventBus};
use shared_types::{AnchorRequest, SessionId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Counters for one worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub confirmed: u64,
    pub unconfirmed: u64,
    pub pending: u64,
    /// Anchors cut short or never started because of shutdown.
    pub aborted: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &AnchorOutcome) {
        match outcome {
            AnchorOutcome::Confirmed { .. } => self.confirmed += 1,
            AnchorOutcome::Unconfirmed { .. } => self.unconfirmed += 1,
            AnchorOutcome::Pending { .. } => self.pending += 1,
        }
    }
}

pub struct AnchorWorker<C, S, E>
where
    C: ChainSubmitter,
    S: AnchorSink,
    E: EventBus,
{
    service: Arc<AnchorService<C, S, E>>,
    permits: Arc<Semaphore>,
}

impl<C, S, E> AnchorWorker<C, S, E>
where
    C: ChainSubmitter + 'static,
    S: AnchorSink + 'static,
    E: EventBus + 'static,
{
    pub fn new(service: Arc<AnchorService<C, S, E>>) -> Self {
        let permits = Arc::new(Semaphore::new(service.config().max_in_flight));
        Self { service, permits }
    }

    /// Next request, dequeued only once a slot is free so a full queue
    /// pushes back on the pipeline. `None` when the queue is closed.
    async fn next_request(
        permits: Arc<Semaphore>,
        requests: &mut mpsc::Receiver<AnchorRequest>,
    ) -> Option<(OwnedSemaphorePermit, AnchorRequest)> {
        // The semaphore is never closed
        let permit = permits.acquire_owned().await.ok()?;
        let request = requests.recv().await?;
        Some((permit, request))
    }

    /// Run until the queue closes or `shutdown` flips to `true`.
    ///
    /// A closed queue lets in-flight anchors finish. Shutdown aborts them
    /// and marks their sessions, and any still queued, `anchor_pending`.
    pub async fn run(
        self,
        mut requests: mpsc::Receiver<AnchorRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();
        let mut tasks: JoinSet<(SessionId, AnchorOutcome)> = JoinSet::new();
        let mut in_flight: HashSet<SessionId> = HashSet::new();
        info!("Anchor worker started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.interrupt(&mut stats, tasks, in_flight, requests).await;
                        info!(?stats, "Anchor worker stopped");
                        return stats;
                    }
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    Self::joined(&mut stats, &mut in_flight, joined);
                }

                next = Self::next_request(self.permits.clone(), &mut requests) => {
                    let Some((permit, request)) = next else { break };
                    stats.received += 1;

                    let session_id = request.session_id;
                    debug!(session_id = %session_id, "Anchor request dequeued");
                    in_flight.insert(session_id);
                    let service = self.service.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        (session_id, service.anchor(request).await)
                    });
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            Self::joined(&mut stats, &mut in_flight, joined);
        }
        info!(?stats, "Anchor queue closed, worker drained");
        stats
    }

    fn joined(
        stats: &mut WorkerStats,
        in_flight: &mut HashSet<SessionId>,
        joined: Result<(SessionId, AnchorOutcome), JoinError>,
    ) {
        match joined {
            Ok((session_id, outcome)) => {
                in_flight.remove(&session_id);
                stats.record(&outcome);
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "Anchor task ended abnormally"),
        }
    }

    async fn interrupt(
        &self,
        stats: &mut WorkerStats,
        mut tasks: JoinSet<(SessionId, AnchorOutcome)>,
        mut in_flight: HashSet<SessionId>,
        mut requests: mpsc::Receiver<AnchorRequest>,
    ) {
        tasks.abort_all();
        // Anchors that finished before the abort landed still count
        while let Some(joined) = tasks.join_next().await {
            Self::joined(stats, &mut in_flight, joined);
        }

        requests.close();
        while let Ok(request) = requests.try_recv() {
            in_flight.insert(request.session_id);
        }

        stats.aborted = in_flight.len() as u64;
        if stats.aborted > 0 {
            warn!(unfinished = stats.aborted, "Shutdown with anchors unfinished");
        }
        for session_id in in_flight {
            self.service.mark_interrupted(session_id).await;
        }
    }
}
