//! # Node Runtime Library
//!
//! Wiring for the `lucid-node` binary, exposed as a library for tests.
//!
//! ## Architectural Patterns
//!
//! - **EDA**: subsystems publish lifecycle events to the shared bus; audit
//!   and monitoring handlers subscribe
//! - **Hexagonal Architecture**: each subsystem's outbound ports are
//!   satisfied here, by in-memory stores or by another subsystem's API
//! - **Queue hand-off**: the pipeline never waits on the chain; completed
//!   roots go to the anchor worker through a bounded queue

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, SubsystemContainer};
pub use runtime::{NodeRuntime, RuntimeError, ShutdownReport};
