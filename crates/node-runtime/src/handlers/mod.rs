//! # Event Handlers
//!
//! Long-running tasks owned by the runtime: bus consumers and periodic
//! maintenance.

pub mod audit;
pub mod maintenance;
pub mod monitor;

pub use audit::{AuditHandler, AuditStats};
pub use maintenance::KeyMaintenance;
pub use monitor::MetricsHandler;
