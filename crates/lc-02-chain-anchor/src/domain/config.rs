//! Anchor client configuration.

use super::errors::AnchorConfigError;
use super::retry::RetryPolicy;
use std::time::Duration;

/// Anchor client configuration
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    /// Submission attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Growth factor between attempts
    pub backoff_multiplier: f64,
    /// Upper bound for a single backoff delay
    pub max_backoff: Duration,
    /// Add deterministic jitter to backoff delays
    pub jitter: bool,
    /// Deadline for each chain call
    pub rpc_timeout: Duration,
    /// Confirmations required before an anchor counts as final
    pub confirmation_threshold: u64,
    /// Delay between confirmation polls
    pub poll_interval: Duration,
    /// Polls before giving up on confirmation
    pub max_polls: u32,
    /// Anchors processed concurrently by the worker
    pub max_in_flight: usize,
    /// Capacity of the anchor request queue
    pub queue_capacity: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            jitter: false,
            rpc_timeout: Duration::from_secs(10),
            confirmation_threshold: 12,
            poll_interval: Duration::from_secs(5),
            max_polls: 120,
            max_in_flight: 16,
            queue_capacity: 256,
        }
    }
}

impl AnchorConfig {
    pub fn validate(&self) -> Result<(), AnchorConfigError> {
        if self.max_attempts == 0 {
            return Err(AnchorConfigError::Zero("max_attempts"));
        }
        if self.rpc_timeout.is_zero() {
            return Err(AnchorConfigError::Zero("rpc_timeout"));
        }
        if self.confirmation_threshold == 0 {
            return Err(AnchorConfigError::Zero("confirmation_threshold"));
        }
        if self.max_polls == 0 {
            return Err(AnchorConfigError::Zero("max_polls"));
        }
        if self.max_in_flight == 0 {
            return Err(AnchorConfigError::Zero("max_in_flight"));
        }
        if self.queue_capacity == 0 {
            return Err(AnchorConfigError::Zero("queue_capacity"));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(AnchorConfigError::Multiplier(self.backoff_multiplier));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(AnchorConfigError::BackoffBounds {
                initial_ms: self.initial_backoff.as_millis() as u64,
                max_ms: self.max_backoff.as_millis() as u64,
            });
        }
        Ok(())
    }

    /// Backoff schedule for submissions.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay_ms: self.initial_backoff.as_millis() as u64,
            max_delay_ms: self.max_backoff.as_millis() as u64,
            backoff_multiplier: self.backoff_multiplier,
            jitter: self.jitter,
        }
    }
}
