//! # Bridge Router
//!
//! Routes cross-chain operations through pluggable messaging adapters and
//! tracks each one through an at-most-once lifecycle.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Registry of bridge adapters (LayerZero, Stargate, Chainlink CCIP)
//! - Cheapest-adapter selection and fee quoting
//! - Dispatch of transfers, messages, state reads and compose bundles
//! - Lifecycle callbacks: `PENDING → DELIVERED → COMPLETED | FAILED`
//!
//! ## Guarantees
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | Unique operation ids | Persisted per-router nonce in the id preimage |
//! | Forward-only status | `invariant_forward_transition` |
//! | Callback authority | Only the assigned adapter resolves an operation |
//! | At-most-once inbound | Per-id inbound marks plus transport replay checks |
//!
//! ## Module Structure
//!
//! ```text
//! bridge-router/
//! ├── domain/      # Operation, requests, options, errors, invariants
//! ├── algorithms/  # Operation id derivation, adapter selection
//! ├── ports/       # BridgeRouterApi, RouterGateway, BridgeAdapter, stores
//! ├── adapters/    # LayerZero, Stargate, CCIP, codec, in-memory infra
//! └── service.rs   # BridgeRouter
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use algorithms::{derive_operation_id, is_candidate, select_best_adapter, Selection};
pub use domain::{
    invariant_forward_transition, invariant_valid_compose, invariant_valid_message,
    invariant_valid_params, invariant_valid_read, invariant_valid_transfer, AdapterParams,
    Address, BridgeError, BridgeOptions, CallContext, ChainId, ComposeAction, ComposeRequest,
    DeliveryOutcome, DispatchContext, DispatchReceipt, ErrorCategory, FeeEstimate, FeeQuote,
    Hash, InboundDelivery, InboundPayload, MessageRequest, Operation, OperationDraft, OperationId,
    OperationStatus, OperationType, ReadRequest, RouterConfig, TransferRequest, U256,
    DEFAULT_MAX_ADAPTERS, MAX_CALLDATA_SIZE, ZERO_ADDRESS,
};
pub use ports::{
    AccessControl, AssetLedger, BridgeAdapter, BridgeReceiver, BridgeRouterApi, Clock,
    OperationStore, RouterGateway, StateReader,
};
pub use service::BridgeRouter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
