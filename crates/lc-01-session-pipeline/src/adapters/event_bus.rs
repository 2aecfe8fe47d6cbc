//! Event Bus adapters
//!
//! Implements the EventBus port over the shared bus, plus a recorder for
//! tests.

use crate::ports::EventBus;
use async_trait::async_trait;
use shared_bus::{EventPublisher, LucidEvent};
use std::sync::Arc;

/// Forwards session events to the node-wide bus.
pub struct SharedBusAdapter<P: EventPublisher> {
    publisher: Arc<P>,
}

impl<P: EventPublisher> SharedBusAdapter<P> {
    pub fn new(publisher: Arc<P>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl<P: EventPublisher> EventBus for SharedBusAdapter<P> {
    async fn publish(&self, event: LucidEvent) -> Result<(), String> {
        // Zero receivers is not an error; the bus already logs the drop
        self.publisher.publish(event).await;
        Ok(())
    }
}

/// Keeps every published event in order.
#[derive(Default)]
pub struct RecordingEventBus {
    events: parking_lot::RwLock<Vec<LucidEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<LucidEvent> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn publish(&self, event: LucidEvent) -> Result<(), String> {
        self.events.write().push(event);
        Ok(())
    }
}
