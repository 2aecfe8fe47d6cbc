//! Adapters layer

pub mod event_bus;
pub mod memory;

pub use event_bus::{RecordingEventBus, SharedBusAdapter};
pub use memory::{
    InMemoryIdentityRegistry, InMemoryProofStore, InMemoryRewardLedger, StaticSessionRoots,
};
