//! Adapters layer

pub mod anchor_queue;
pub mod event_bus;
pub mod memory;

pub use anchor_queue::QueueAnchorScheduler;
pub use event_bus::{RecordingEventBus, SharedBusAdapter};
pub use memory::{InMemoryChunkStore, InMemorySessionStore};
