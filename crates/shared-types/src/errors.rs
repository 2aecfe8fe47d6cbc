//! # Error Types
//!
//! Errors shared by every subsystem that touches ids or the document store.

use thiserror::Error;

/// Malformed identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Invalid node id: {0:?}")]
    InvalidNodeId(String),

    #[error("Invalid owner address: {0}")]
    InvalidOwnerAddress(String),
}

/// Failures reported by document-store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Document not found.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// A write conflicted with an existing document.
    #[error("Write conflict on {0}")]
    Conflict(String),

    /// The store did not answer within the configured deadline.
    #[error("Store operation timed out after {0}ms")]
    Timeout(u64),

    /// Backend unavailable or returned an error.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures are worth retrying on the next cycle.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}
