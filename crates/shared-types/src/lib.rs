//! # Shared Types Crate
//!
//! Domain identifiers, persisted document shapes and cross-subsystem
//! payloads for the Lucid session and PoOT node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: types crossing a subsystem boundary live here.
//! - **Documents mirror storage**: `SessionRecord` serializes to the exact
//!   session document layout (`_id`, optional fields omitted when unset).
//! - **Typed ids**: `SessionId`, `NodeId` and `OwnerAddress` are validated
//!   newtypes, never bare strings.

pub mod entities;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use errors::*;
pub use ipc::*;

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
