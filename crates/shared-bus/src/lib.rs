//! # Shared Bus - Event Bus for Subsystem Notifications
//!
//! Session lifecycle, anchoring, proof and settlement notifications are
//! published here and consumed by audit and monitoring tasks. Publishers
//! never know who is listening.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Pipeline     │                    │ Audit task   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Events needing a human (Merkle input desync) go to the
//! `DeadLetterQueue` topic.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, LucidEvent, CHAIN_ANCHOR, POOT_CONSENSUS, SESSION_PIPELINE};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
