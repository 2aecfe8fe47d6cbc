//! Error types for the chain anchor client.

use thiserror::Error;

/// Failure of a single chain call.
///
/// `Timeout` and `Rpc` are transient and retried with backoff. `Rejected`
/// means the chain refused the anchor and retrying the same payload cannot
/// help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorSubmissionError {
    /// No answer within the RPC deadline.
    #[error("chain call timed out after {0}ms")]
    Timeout(u64),

    /// Transport or node-side failure.
    #[error("chain rpc error: {0}")]
    Rpc(String),

    /// The chain refused or reverted the anchor transaction.
    #[error("anchor rejected: {0}")]
    Rejected(String),
}

impl AnchorSubmissionError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Invalid anchor configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnchorConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("backoff multiplier must be >= 1.0, got {0}")]
    Multiplier(f64),

    #[error("max backoff {max_ms}ms is below initial backoff {initial_ms}ms")]
    BackoffBounds { initial_ms: u64, max_ms: u64 },
}
