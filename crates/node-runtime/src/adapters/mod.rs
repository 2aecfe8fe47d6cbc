//! # Runtime Adapters
//!
//! Outbound ports of one subsystem implemented over another subsystem's
//! inbound API. This is the only place subsystems meet directly.

pub mod anchor_sink;
pub mod chain;
pub mod session_roots;

pub use anchor_sink::SessionAnchorSink;
pub use chain::ChainBackend;
pub use session_roots::PipelineRootLookup;
