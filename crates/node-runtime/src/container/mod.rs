//! # Subsystem Container
//!
//! Holds the subsystem instances of one node and the queues between them.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig};
pub use subsystems::{
    AnchorServiceImpl, ContainerError, PipelineServiceImpl, PootServiceImpl, SubsystemContainer,
};
