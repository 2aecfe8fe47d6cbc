//! # Retry With Exponential Backoff
//!
//! - delay = `initial_delay_ms * multiplier^(attempt-1)`, clamped to `max_delay_ms`
//! - optional deterministic jitter: `+ (attempt * 7919 + 104729) % (base/4 + 1)`,
//!   clamped again
//! - errors that are not retryable stop the loop immediately
//! - every retry path sleeps on the tokio clock, so paused-time tests
//!   advance through the schedule instantly

use super::errors::AnchorSubmissionError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts including the first. The first always runs, so 0 acts as 1.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

/// Errors that know whether another attempt can help.
pub trait Retryable: Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AnchorSubmissionError {
    fn is_retryable(&self) -> bool {
        AnchorSubmissionError::is_retryable(self)
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryResult<T, E> {
    Success { value: T, attempts: u32 },
    /// Budget spent, or the error was not retryable.
    Exhausted { last_error: E, attempts: u32 },
}

/// Delay in milliseconds after a failed `attempt` (1-indexed).
pub fn compute_delay(policy: &RetryPolicy, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);

    let max = policy.max_delay_ms as f64;
    // NaN, negative and infinite products all land inside [0, max]
    let clamped = if base.is_nan() || base < 0.0 {
        0.0
    } else {
        base.min(max)
    };
    let mut delay = (clamped as u64).min(policy.max_delay_ms);

    if policy.jitter {
        let quarter = delay / 4;
        if quarter > 0 {
            let offset = u64::from(attempt)
                .wrapping_mul(7919)
                .wrapping_add(104_729)
                % (quarter + 1);
            delay = delay.saturating_add(offset).min(policy.max_delay_ms);
        }
    }

    delay
}

/// Run `operation` until it succeeds, fails permanently, or the budget
/// runs out.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);

        match operation(attempts).await {
            Ok(value) => return RetryResult::Success { value, attempts },
            Err(error) => {
                if !error.is_retryable() || attempts >= policy.max_attempts {
                    return RetryResult::Exhausted {
                        last_error: error,
                        attempts,
                    };
                }

                let delay_ms = compute_delay(policy, attempts);
                warn!(
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    delay_ms,
                    error = %error,
                    "Retrying after backoff"
                );
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}
