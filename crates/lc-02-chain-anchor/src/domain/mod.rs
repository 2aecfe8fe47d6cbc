//! Domain layer: backoff schedule, configuration and outcomes.

pub mod config;
pub mod errors;
pub mod outcome;
pub mod retry;

pub use config::AnchorConfig;
pub use errors::*;
pub use outcome::AnchorOutcome;
pub use retry::{compute_delay, retry_with_backoff, RetryPolicy, RetryResult, Retryable};
