//! # Domain Errors
//!
//! Error types surfaced at the router and adapter boundary.
//!
//! Every error aborts the whole call; no partial state survives a failure.

use bridge_types::{address_hex, Address, ChainId, Hash, OperationId, OperationStatus, U256};
use thiserror::Error;

/// Bridge error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    // =========================================================================
    // AUTHORIZATION
    // =========================================================================
    /// Caller lacks the capability required by the entry point.
    #[error("Unauthorized caller: {}", address_hex(.0))]
    Unauthorized(Address),

    // =========================================================================
    // CAPABILITY MISMATCH
    // =========================================================================
    /// Destination chain not supported by the adapter.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(ChainId),

    /// Asset not supported on the destination chain.
    #[error("Unsupported asset {} on chain {chain_id}", address_hex(.asset))]
    UnsupportedAsset {
        /// Destination chain.
        chain_id: ChainId,
        /// Asset address.
        asset: Address,
    },

    /// Inbound message carries a tag the adapter does not handle.
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(u8),

    /// The adapter does not implement this operation type.
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// No registered adapter supports the requested route.
    #[error("No suitable adapter for chain {dest_chain}")]
    NoSuitableAdapter {
        /// Destination chain.
        dest_chain: ChainId,
    },

    // =========================================================================
    // ECONOMIC
    // =========================================================================
    /// Attached value is below the adapter's quote.
    #[error("Insufficient fee: required {required}, provided {provided}")]
    InsufficientFee {
        /// Quoted requirement.
        required: U256,
        /// Value attached to the call.
        provided: U256,
    },

    /// Attached value is below the transport endpoint's quote.
    #[error("Insufficient msg value: required {required}, provided {provided}")]
    InsufficientMsgValue {
        /// Endpoint requirement.
        required: U256,
        /// Value forwarded to the endpoint.
        provided: U256,
    },

    /// Ledger balance too low for a transfer.
    #[error("Insufficient balance of {} for {}: required {required}, available {available}", address_hex(.asset), address_hex(.holder))]
    InsufficientBalance {
        /// Asset address.
        asset: Address,
        /// Account being debited.
        holder: Address,
        /// Amount requested.
        required: U256,
        /// Amount held.
        available: U256,
    },

    // =========================================================================
    // STATE
    // =========================================================================
    /// Adapter is already in the registry.
    #[error("Adapter already registered: {}", address_hex(.0))]
    AdapterAlreadyRegistered(Address),

    /// Adapter is not in the registry.
    #[error("Unknown adapter: {}", address_hex(.0))]
    UnknownAdapter(Address),

    /// Registry is at its configured capacity.
    #[error("Adapter limit reached: {0}")]
    AdapterLimitReached(usize),

    /// No operation with this id.
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// A derived id already exists in the store.
    #[error("Operation id collision: {0}")]
    OperationIdCollision(OperationId),

    /// Request parameters rejected before dispatch.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Router is paused for new operations.
    #[error("Router paused")]
    Paused,

    /// Status move is not forward in the state machine.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: OperationStatus,
        /// Attempted status.
        to: OperationStatus,
    },

    /// Inbound packet or operation was already processed.
    #[error("Duplicate delivery: 0x{}", hex::encode(.0))]
    DuplicateDelivery(Hash),

    // =========================================================================
    // TRANSPORT
    // =========================================================================
    /// Wire payload could not be decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Transport options could not be decoded.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The router behind an adapter has been dropped.
    #[error("Router unavailable")]
    RouterUnavailable,

    // =========================================================================
    // STORAGE
    // =========================================================================
    /// Operation store failure.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Error taxonomy used for caller-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong credentials; resubmit as the right caller.
    Authorization,
    /// Unsupported route or operation; change parameters or adapter.
    Capability,
    /// Underpaid; resubmit with a higher fee.
    Economic,
    /// Precondition not met; fix the precondition first.
    State,
    /// Wire or transport failure.
    Transport,
    /// Persistence failure.
    Storage,
}

impl BridgeError {
    /// Classify the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) => ErrorCategory::Authorization,
            Self::UnsupportedChain(_)
            | Self::UnsupportedAsset { .. }
            | Self::UnsupportedMessageType(_)
            | Self::OperationNotSupported(_)
            | Self::NoSuitableAdapter { .. } => ErrorCategory::Capability,
            Self::InsufficientFee { .. }
            | Self::InsufficientMsgValue { .. }
            | Self::InsufficientBalance { .. } => ErrorCategory::Economic,
            Self::AdapterAlreadyRegistered(_)
            | Self::UnknownAdapter(_)
            | Self::AdapterLimitReached(_)
            | Self::UnknownOperation(_)
            | Self::OperationIdCollision(_)
            | Self::InvalidParams(_)
            | Self::Paused
            | Self::InvalidStatusTransition { .. }
            | Self::DuplicateDelivery(_) => ErrorCategory::State,
            Self::InvalidPayload(_)
            | Self::InvalidOptions(_)
            | Self::TransportError(_)
            | Self::RouterUnavailable => ErrorCategory::Transport,
            Self::StorageError(_) => ErrorCategory::Storage,
        }
    }

    /// Whether resubmitting with more value can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Economic
    }

    /// Capability mismatches let selection skip a candidate instead of aborting.
    #[must_use]
    pub fn is_capability_mismatch(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedChain(_) | Self::UnsupportedAsset { .. } | Self::OperationNotSupported(_)
        )
    }
}
