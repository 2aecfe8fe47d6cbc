//! Adapters layer

pub mod event_bus;
pub mod json_rpc;
pub mod scripted_chain;
pub mod sink;

pub use event_bus::{RecordingEventBus, SharedBusAdapter};
pub use json_rpc::JsonRpcChainSubmitter;
pub use scripted_chain::{ChainStep, ScriptedChain};
pub use sink::{RecordingAnchorSink, SinkCall};
