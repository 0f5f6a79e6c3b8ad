//! # Bridge Bus - Lifecycle Event Bus
//!
//! Carries the router's observable side effects (registry changes, pause
//! toggles, dispatches, status transitions, inbound deliveries) to whoever
//! is watching: indexers, relayer tooling, tests.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ BridgeRouter │                    │   Watcher    │
//! │  (chain N)   │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing is fire-and-forget: a bus with no subscribers drops events and
//! never fails the publishing call.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BridgeEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
