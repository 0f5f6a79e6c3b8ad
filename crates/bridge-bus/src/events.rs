//! # Bridge Events
//!
//! Every event that flows through the bus. Each variant carries the
//! `chain_id` of the router that emitted it.

use bridge_types::{Address, ChainId, OperationId, OperationStatus, OperationType};
use serde::{Deserialize, Serialize};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BridgeEvent {
    // =========================================================================
    // REGISTRY
    // =========================================================================
    /// An adapter was appended to the registry.
    AdapterRegistered {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Adapter address.
        adapter: Address,
    },

    /// An adapter was removed from the registry.
    AdapterRemoved {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Adapter address.
        adapter: Address,
    },

    // =========================================================================
    // GOVERNANCE
    // =========================================================================
    /// New operations are blocked.
    Paused {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Guardian or governor that paused.
        by: Address,
    },

    /// New operations are accepted again.
    Unpaused {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Governor that unpaused.
        by: Address,
    },

    // =========================================================================
    // DISPATCH (source chain)
    // =========================================================================
    /// An operation was accepted and handed to its adapter.
    OperationDispatched {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Operation identifier.
        operation_id: OperationId,
        /// Operation kind.
        operation_type: OperationType,
        /// Destination chain.
        dest_chain: ChainId,
        /// Adapter assigned to the operation.
        adapter: Address,
        /// Account that requested the operation.
        originator: Address,
    },

    // =========================================================================
    // LIFECYCLE (source chain)
    // =========================================================================
    /// An operation moved forward in its state machine.
    OperationStatusUpdated {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Operation identifier.
        operation_id: OperationId,
        /// Previous status.
        from: OperationStatus,
        /// New status.
        to: OperationStatus,
    },

    /// A state-read response arrived and was handed to the originator.
    ReadResponseDelivered {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Operation identifier.
        operation_id: OperationId,
        /// Originator that requested the read.
        originator: Address,
        /// Whether the originator's receiver accepted the callback.
        receiver_notified: bool,
    },

    // =========================================================================
    // INBOUND (destination chain)
    // =========================================================================
    /// A transfer, message or compose bundle arrived from another chain.
    MessageReceived {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Operation identifier (assigned by the source router).
        operation_id: OperationId,
        /// Chain the operation originated on.
        source_chain: ChainId,
        /// Local recipient.
        recipient: Address,
        /// Whether the recipient executed the delivery.
        executed: bool,
    },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Error requiring operator attention.
    CriticalError {
        /// Emitting router's chain.
        chain_id: ChainId,
        /// Error description.
        error: String,
    },
}

impl BridgeEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::AdapterRegistered { .. } | Self::AdapterRemoved { .. } => EventTopic::Registry,
            Self::Paused { .. } | Self::Unpaused { .. } => EventTopic::Governance,
            Self::OperationDispatched { .. } => EventTopic::Dispatch,
            Self::OperationStatusUpdated { .. } | Self::ReadResponseDelivered { .. } => {
                EventTopic::Lifecycle
            }
            Self::MessageReceived { .. } => EventTopic::Inbound,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Get the chain of the emitting router.
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        match self {
            Self::AdapterRegistered { chain_id, .. }
            | Self::AdapterRemoved { chain_id, .. }
            | Self::Paused { chain_id, .. }
            | Self::Unpaused { chain_id, .. }
            | Self::OperationDispatched { chain_id, .. }
            | Self::OperationStatusUpdated { chain_id, .. }
            | Self::ReadResponseDelivered { chain_id, .. }
            | Self::MessageReceived { chain_id, .. }
            | Self::CriticalError { chain_id, .. } => *chain_id,
        }
    }

    /// Operation this event refers to, if any.
    #[must_use]
    pub fn operation_id(&self) -> Option<OperationId> {
        match self {
            Self::OperationDispatched { operation_id, .. }
            | Self::OperationStatusUpdated { operation_id, .. }
            | Self::ReadResponseDelivered { operation_id, .. }
            | Self::MessageReceived { operation_id, .. } => Some(*operation_id),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Adapter registry changes.
    Registry,
    /// Pause / unpause.
    Governance,
    /// New operations.
    Dispatch,
    /// Status transitions and read responses.
    Lifecycle,
    /// Deliveries arriving from other chains.
    Inbound,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Chains to include. Empty means all chains.
    pub chains: Vec<ChainId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            chains: Vec::new(),
        }
    }

    /// Create a filter for events emitted on specific chains.
    #[must_use]
    pub fn from_chains(chains: Vec<ChainId>) -> Self {
        Self {
            topics: Vec::new(),
            chains,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BridgeEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let chain_match = self.chains.is_empty() || self.chains.contains(&event.chain_id());

        topic_match && chain_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(chain_id: ChainId) -> BridgeEvent {
        BridgeEvent::OperationStatusUpdated {
            chain_id,
            operation_id: OperationId([1u8; 32]),
            from: OperationStatus::Pending,
            to: OperationStatus::Delivered,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        let event = status_event(1);
        assert_eq!(event.topic(), EventTopic::Lifecycle);
        assert_eq!(event.chain_id(), 1);
        assert_eq!(event.operation_id(), Some(OperationId([1u8; 32])));
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&status_event(1)));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Lifecycle]);
        assert!(filter.matches(&status_event(1)));

        let registry_event = BridgeEvent::AdapterRegistered {
            chain_id: 1,
            adapter: [9u8; 20],
        };
        assert!(!filter.matches(&registry_event));
        assert_eq!(registry_event.operation_id(), None);
    }

    #[test]
    fn test_filter_by_chain() {
        let filter = EventFilter::from_chains(vec![10]);
        assert!(filter.matches(&status_event(10)));
        assert!(!filter.matches(&status_event(1)));
    }

    #[test]
    fn test_critical_error_routes_to_dlq() {
        let event = BridgeEvent::CriticalError {
            chain_id: 1,
            error: "store unavailable".to_string(),
        };
        assert_eq!(event.topic(), EventTopic::DeadLetterQueue);
    }
}
