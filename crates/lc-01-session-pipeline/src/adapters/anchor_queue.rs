//! Anchor hand-off over a bounded `mpsc` queue.
//!
//! The pipeline never waits for the chain: a full queue is reported back
//! immediately and the session is flagged `anchor_pending` instead.

use crate::ports::AnchorScheduler;
use async_trait::async_trait;
use shared_types::AnchorRequest;
use tokio::sync::mpsc::{self, error::TrySendError};

pub struct QueueAnchorScheduler {
    sender: mpsc::Sender<AnchorRequest>,
}

impl QueueAnchorScheduler {
    pub fn new(sender: mpsc::Sender<AnchorRequest>) -> Self {
        Self { sender }
    }

    /// Scheduler plus the receiving end for the anchor worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AnchorRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl AnchorScheduler for QueueAnchorScheduler {
    async fn schedule_anchor(&self, request: AnchorRequest) -> Result<(), String> {
        self.sender.try_send(request).map_err(|e| match e {
            TrySendError::Full(req) => format!("anchor queue full, session {}", req.session_id),
            TrySendError::Closed(req) => {
                format!("anchor worker stopped, session {}", req.session_id)
            }
        })
    }
}
