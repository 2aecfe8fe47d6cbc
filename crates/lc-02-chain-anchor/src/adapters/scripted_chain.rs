//! Scripted chain client.
//!
//! Answers come from FIFO queues so tests (and a chain-less dev node) can
//! play out timeouts, RPC errors and confirmation progress in order. Once a
//! queue is empty the chain accepts every submission and reports the
//! configured default depth.

use crate::domain::AnchorSubmissionError;
use crate::ports::ChainSubmitter;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::AnchorRequest;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scripted answer to one chain call.
#[derive(Debug, Clone)]
pub enum ChainStep<T> {
    Reply(T),
    Fail(AnchorSubmissionError),
    /// Never answer; the caller's deadline fires first.
    Hang,
}

pub struct ScriptedChain {
    submissions: Mutex<VecDeque<ChainStep<String>>>,
    confirmations: Mutex<VecDeque<ChainStep<u64>>>,
    submitted: Mutex<Vec<AnchorRequest>>,
    default_depth: u64,
    submit_calls: AtomicU64,
    poll_calls: AtomicU64,
}

impl ScriptedChain {
    pub fn new(default_depth: u64) -> Self {
        Self {
            submissions: Mutex::new(VecDeque::new()),
            confirmations: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            default_depth,
            submit_calls: AtomicU64::new(0),
            poll_calls: AtomicU64::new(0),
        }
    }

    pub fn push_submission(&self, step: ChainStep<String>) {
        self.submissions.lock().push_back(step);
    }

    pub fn push_confirmations(&self, step: ChainStep<u64>) {
        self.confirmations.lock().push_back(step);
    }

    /// Requests the chain accepted, in order.
    pub fn accepted(&self) -> Vec<AnchorRequest> {
        self.submitted.lock().clone()
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> u64 {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

async fn play<T>(step: ChainStep<T>) -> Result<T, AnchorSubmissionError> {
    match step {
        ChainStep::Reply(value) => Ok(value),
        ChainStep::Fail(error) => Err(error),
        ChainStep::Hang => {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
            Err(AnchorSubmissionError::Rpc("scripted hang elapsed".into()))
        }
    }
}

#[async_trait]
impl ChainSubmitter for ScriptedChain {
    async fn submit_anchor(&self, request: &AnchorRequest) -> Result<String, AnchorSubmissionError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .submissions
            .lock()
            .pop_front()
            .unwrap_or_else(|| ChainStep::Reply(format!("0x{:064x}", n + 1)));

        let txid = play(step).await?;
        self.submitted.lock().push(request.clone());
        Ok(txid)
    }

    async fn get_confirmations(&self, _txid: &str) -> Result<u64, AnchorSubmissionError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .confirmations
            .lock()
            .pop_front()
            .unwrap_or(ChainStep::Reply(self.default_depth));
        play(step).await
    }
}
