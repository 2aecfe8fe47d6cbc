//! Result of one anchoring run.

use super::errors::AnchorSubmissionError;

/// How far an anchor got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// Submitted and buried under at least the configured confirmations.
    Confirmed { txid: String, confirmations: u64 },

    /// Submitted, but the threshold was not reached within the poll budget.
    /// The txid stays on the session and the anchor is not retried.
    Unconfirmed { txid: String, confirmations: u64 },

    /// Never accepted by the chain, or reverted. The session keeps
    /// `anchor_pending`.
    Pending {
        attempts: u32,
        last_error: AnchorSubmissionError,
    },
}

impl AnchorOutcome {
    /// Transaction id, when the chain accepted one.
    #[must_use]
    pub fn txid(&self) -> Option<&str> {
        match self {
            Self::Confirmed { txid, .. } | Self::Unconfirmed { txid, .. } => Some(txid),
            Self::Pending { .. } => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Unconfirmed { .. } => "unconfirmed",
            Self::Pending { .. } => "pending",
        }
    }
}
