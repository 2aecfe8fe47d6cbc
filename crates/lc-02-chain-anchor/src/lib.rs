//! # lc-02-chain-anchor
//!
//! Anchors completed session roots on chain.
//!
//! ## Architecture
//!
//! The session pipeline drops an [`AnchorRequest`](shared_types::AnchorRequest)
//! on a queue when a session completes; the [`AnchorWorker`] drains it off
//! the ingestion path:
//!
//! ```text
//! [anchor queue] ──→ AnchorWorker ──→ AnchorService ──→ ChainSubmitter
//!                                          │
//!                          AnchorSink ←────┴────→ event bus
//! ```
//!
//! Submission retries with exponential backoff under a per-call deadline.
//! Exhausting the budget leaves the session `completed` with
//! `anchor_pending`; it never fails the session.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lc_02_chain_anchor::{AnchorDependencies, AnchorService, AnchorWorker};
//!
//! let service = Arc::new(AnchorService::new(deps)?);
//! let stats = AnchorWorker::new(service).run(requests, shutdown).await;
//! ```

pub mod adapters;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::{
    ChainStep, JsonRpcChainSubmitter, RecordingAnchorSink, RecordingEventBus, ScriptedChain,
    SharedBusAdapter, SinkCall,
};
pub use domain::{AnchorConfig, AnchorConfigError, AnchorOutcome, AnchorSubmissionError};
pub use ports::{AnchorClientApi, AnchorSink, ChainSubmitter, EventBus};
pub use service::{AnchorDependencies, AnchorService, AnchorWorker, WorkerStats, INTERRUPTED};
