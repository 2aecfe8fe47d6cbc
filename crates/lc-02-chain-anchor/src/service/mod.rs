//! Anchor Service
//!
//! Drives one anchor from submission to confirmation:
//!
//! 1. `submit_anchor` under the RPC deadline, retried with exponential
//!    backoff until the attempt budget is spent
//! 2. on success the txid goes to the sink and the bus
//! 3. `get_confirmations` every poll interval until the threshold or the
//!    poll budget
//!
//! An exhausted budget is not a session failure: the sink marks the
//! session `anchor_pending` and one `AnchorSubmissionError` is logged.

mod worker;

pub use worker::{AnchorWorker, WorkerStats};

use crate::domain::{
    retry_with_backoff, AnchorConfig, AnchorConfigError, AnchorOutcome, AnchorSubmissionError,
    RetryPolicy, RetryResult,
};
use crate::metrics;
use crate::ports::{AnchorClientApi, AnchorSink, ChainSubmitter, EventBus};
use async_trait::async_trait;
use shared_bus::LucidEvent;
use shared_types::{AnchorRequest, SessionId};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// `last_error` of anchors dropped at shutdown.
pub const INTERRUPTED: &str = "interrupted by shutdown";

/// Dependencies for the anchor service
pub struct AnchorDependencies<C, S, E> {
    pub chain: Arc<C>,
    pub sink: Arc<S>,
    pub event_bus: Arc<E>,
    pub config: AnchorConfig,
}

/// Anchor client service
pub struct AnchorService<C, S, E>
where
    C: ChainSubmitter,
    S: AnchorSink,
    E: EventBus,
{
    chain: Arc<C>,
    sink: Arc<S>,
    event_bus: Arc<E>,
    config: AnchorConfig,
    retry: RetryPolicy,
}

impl<C, S, E> AnchorService<C, S, E>
where
    C: ChainSubmitter,
    S: AnchorSink,
    E: EventBus,
{
    pub fn new(deps: AnchorDependencies<C, S, E>) -> Result<Self, AnchorConfigError> {
        deps.config.validate()?;
        let retry = deps.config.retry_policy();
        Ok(Self {
            chain: deps.chain,
            sink: deps.sink,
            event_bus: deps.event_bus,
            config: deps.config,
            retry,
        })
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, AnchorSubmissionError>>,
    ) -> Result<T, AnchorSubmissionError> {
        let deadline = self.config.rpc_timeout;
        match tokio::time::timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(AnchorSubmissionError::Timeout(deadline.as_millis() as u64)),
        }
    }

    async fn publish(&self, event: LucidEvent) {
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(error = %e, "Failed to publish anchor event");
        }
    }

    async fn submit(&self, request: &AnchorRequest) -> RetryResult<String, AnchorSubmissionError> {
        retry_with_backoff(&self.retry, move |attempt| {
            metrics::record_submission_attempt();
            debug!(session_id = %request.session_id, attempt, "Submitting anchor");
            self.with_deadline(self.chain.submit_anchor(request))
        })
        .await
    }

    async fn give_up(
        &self,
        session_id: SessionId,
        attempts: u32,
        last_error: AnchorSubmissionError,
    ) -> AnchorOutcome {
        error!(
            session_id = %session_id,
            attempts,
            error = %last_error,
            "AnchorSubmissionError: giving up, session stays completed with anchor pending"
        );
        if let Err(e) = self.sink.anchor_pending(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to mark anchor pending");
        }
        self.publish(LucidEvent::AnchorPending {
            session_id,
            attempts,
            last_error: last_error.to_string(),
        })
        .await;
        metrics::record_outcome("pending");
        AnchorOutcome::Pending {
            attempts,
            last_error,
        }
    }

    /// Anchor cut short by shutdown. The session keeps `anchor_pending` so
    /// the root can be submitted again.
    pub async fn mark_interrupted(&self, session_id: SessionId) {
        warn!(session_id = %session_id, "Anchor interrupted by shutdown, marking anchor pending");
        if let Err(e) = self.sink.anchor_pending(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to mark anchor pending");
        }
        self.publish(LucidEvent::AnchorPending {
            session_id,
            attempts: 0,
            last_error: INTERRUPTED.to_string(),
        })
        .await;
        metrics::record_outcome("interrupted");
    }

    async fn poll(&self, session_id: SessionId, txid: String) -> AnchorOutcome {
        let threshold = self.config.confirmation_threshold;
        let mut depth = 0;

        for poll in 1..=self.config.max_polls {
            metrics::record_confirmation_poll();
            match self.with_deadline(self.chain.get_confirmations(&txid)).await {
                Ok(confirmations) => {
                    depth = confirmations;
                    if confirmations >= threshold {
                        info!(session_id = %session_id, txid = %txid, confirmations, "Anchor confirmed");
                        if let Err(e) = self.sink.anchor_confirmed(session_id).await {
                            warn!(session_id = %session_id, error = %e, "Failed to record anchor confirmation");
                        }
                        self.publish(LucidEvent::AnchorConfirmed {
                            session_id,
                            txid: txid.clone(),
                            confirmations,
                        })
                        .await;
                        metrics::record_outcome("confirmed");
                        return AnchorOutcome::Confirmed { txid, confirmations };
                    }
                    debug!(session_id = %session_id, poll, confirmations, threshold, "Anchor not deep enough yet");
                }
                Err(e @ AnchorSubmissionError::Rejected(_)) => {
                    return self.give_up(session_id, 1, e).await;
                }
                Err(e) => {
                    // The txid is still valid; a failed poll only costs one round
                    warn!(session_id = %session_id, txid = %txid, poll, error = %e, "Confirmation poll failed");
                }
            }
            if poll < self.config.max_polls {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        warn!(
            session_id = %session_id,
            txid = %txid,
            confirmations = depth,
            threshold,
            "Anchor not confirmed within poll budget"
        );
        metrics::record_outcome("unconfirmed");
        AnchorOutcome::Unconfirmed {
            txid,
            confirmations: depth,
        }
    }
}

#[async_trait]
impl<C, S, E> AnchorClientApi for AnchorService<C, S, E>
where
    C: ChainSubmitter,
    S: AnchorSink,
    E: EventBus,
{
    async fn anchor(&self, request: AnchorRequest) -> AnchorOutcome {
        let session_id = request.session_id;
        let txid = match self.submit(&request).await {
            RetryResult::Success { value, attempts } => {
                info!(session_id = %session_id, txid = %value, attempts, "Anchor submitted");
                value
            }
            RetryResult::Exhausted {
                last_error,
                attempts,
            } => return self.give_up(session_id, attempts, last_error).await,
        };

        if let Err(e) = self.sink.anchor_submitted(session_id, &txid).await {
            warn!(session_id = %session_id, txid = %txid, error = %e, "Failed to record anchor txid");
        }
        self.publish(LucidEvent::AnchorSubmitted {
            session_id,
            txid: txid.clone(),
        })
        .await;

        self.poll(session_id, txid).await
    }

    async fn await_confirmations(&self, session_id: SessionId, txid: String) -> AnchorOutcome {
        self.poll(session_id, txid).await
    }
}

#[cfg(test)]
mod tests;
