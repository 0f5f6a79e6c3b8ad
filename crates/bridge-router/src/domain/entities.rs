//! # Domain Entities
//!
//! Operation record, dispatch requests, options and quotes.

use bridge_types::{
    Address, ChainId, Hash, OperationId, OperationStatus, OperationType, U256, ZERO_ADDRESS,
};
use serde::{Deserialize, Serialize};

/// Persisted record of one cross-chain operation, owned by the source router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Content-derived identifier.
    pub id: OperationId,
    /// Operation kind.
    pub operation_type: OperationType,
    /// Current lifecycle status.
    pub status: OperationStatus,
    /// Chain the operation was dispatched from.
    pub source_chain: ChainId,
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Asset moved (zero for non-transfers).
    pub asset: Address,
    /// Amount moved (zero for non-transfers).
    pub amount: U256,
    /// Destination recipient (read target for state reads).
    pub recipient: Address,
    /// Account that requested the operation.
    pub originator: Address,
    /// Transport nonce consumed by this dispatch.
    pub nonce: u64,
    /// Dispatch timestamp.
    pub created_at: u64,
    /// Last status change.
    pub updated_at: u64,
    /// Transport GUID or message id returned by the adapter.
    pub transport_id: Hash,
    /// Read response, once delivered.
    pub response: Option<Vec<u8>>,
    assigned_adapter: Address,
}

impl Operation {
    /// Create a pending operation bound to `adapter`.
    pub fn new(
        id: OperationId,
        draft: &OperationDraft,
        adapter: Address,
        nonce: u64,
        transport_id: Hash,
        now: u64,
    ) -> Self {
        Self {
            id,
            operation_type: draft.operation_type,
            status: OperationStatus::Pending,
            source_chain: draft.source_chain,
            dest_chain: draft.dest_chain,
            asset: draft.asset,
            amount: draft.amount,
            recipient: draft.recipient,
            originator: draft.originator,
            nonce,
            created_at: now,
            updated_at: now,
            transport_id,
            response: None,
            assigned_adapter: adapter,
        }
    }

    /// Adapter that dispatched this operation. Fixed at creation.
    #[must_use]
    pub fn assigned_adapter(&self) -> Address {
        self.assigned_adapter
    }
}

/// The content of a request that feeds id derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationDraft {
    /// Operation kind.
    pub operation_type: OperationType,
    /// Local chain.
    pub source_chain: ChainId,
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Asset (zero for non-transfers).
    pub asset: Address,
    /// Amount (zero for non-transfers).
    pub amount: U256,
    /// Recipient or read target.
    pub recipient: Address,
    /// Requesting account.
    pub originator: Address,
}

/// Transport execution hints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterParams {
    /// Destination execution gas. `None` uses the adapter default.
    pub gas_limit: Option<u64>,
    /// Expected call data size (reads) or payload size (messages).
    pub calldata_size: u32,
    /// Native value to deliver with the destination call.
    pub msg_value: U256,
    /// Pre-encoded transport options. Empty means build from the fields above.
    pub options: Vec<u8>,
}

impl AdapterParams {
    /// Params with only a gas limit set.
    #[must_use]
    pub fn with_gas(gas_limit: u64) -> Self {
        Self {
            gas_limit: Some(gas_limit),
            ..Self::default()
        }
    }

    /// Requested gas, or `default` when unset. An explicit zero stays zero.
    #[must_use]
    pub fn gas_or(&self, default: u64) -> u64 {
        self.gas_limit.unwrap_or(default)
    }
}

/// Caller options for quotes and dispatches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Adapter to use instead of automatic selection.
    pub specified_adapter: Option<Address>,
    /// Transport hints forwarded to the adapter.
    pub adapter_params: AdapterParams,
}

impl BridgeOptions {
    /// Options pinned to one adapter.
    #[must_use]
    pub fn with_adapter(adapter: Address) -> Self {
        Self {
            specified_adapter: Some(adapter),
            adapter_params: AdapterParams::default(),
        }
    }

    /// Specified adapter, treating the zero address as unset.
    #[must_use]
    pub fn adapter(&self) -> Option<Address> {
        self.specified_adapter.filter(|a| *a != ZERO_ADDRESS)
    }
}

/// Fee reported by an adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Fee payable in native value with the call.
    pub native_fee: U256,
    /// Fee taken from the transferred amount.
    pub token_fee: U256,
}

/// Fee reported by the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeQuote {
    /// Fee payable in native value with the call.
    pub native_fee: U256,
    /// Fee taken from the transferred amount.
    pub token_fee: U256,
    /// Adapter the quote was computed for.
    pub selected_adapter: Address,
}

/// Identity and attached value of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Calling account.
    pub sender: Address,
    /// Attached native value.
    pub value: U256,
}

impl CallContext {
    /// Call with no attached value.
    #[must_use]
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            value: U256::zero(),
        }
    }

    /// Call with attached value.
    #[must_use]
    pub fn with_value(sender: Address, value: U256) -> Self {
        Self { sender, value }
    }
}

/// Asset transfer request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Asset to move.
    pub asset: Address,
    /// Amount to move.
    pub amount: U256,
    /// Destination recipient.
    pub recipient: Address,
}

/// Remote state read request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRequest {
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Contract to read.
    pub target: Address,
    /// Function selector.
    pub selector: [u8; 4],
    /// Encoded call arguments.
    pub call_data: Vec<u8>,
    /// Account that receives the response.
    pub originator: Address,
}

/// Arbitrary message request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRequest {
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Destination recipient.
    pub recipient: Address,
    /// Opaque payload.
    pub payload: Vec<u8>,
    /// Sending account.
    pub originator: Address,
}

/// One action of a compose bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeAction {
    /// Contract the action calls.
    pub target: Address,
    /// Encoded call.
    pub payload: Vec<u8>,
}

/// Compose bundle request. The caller is both originator and destination receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposeRequest {
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Actions executed atomically on the destination.
    pub actions: Vec<ComposeAction>,
}

/// Per-dispatch context handed from the router to an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchContext {
    /// Calling account (the router).
    pub caller: Address,
    /// Native value forwarded with the dispatch.
    pub value: U256,
    /// Id the router assigned.
    pub operation_id: OperationId,
    /// Local chain.
    pub source_chain: ChainId,
    /// Destination chain.
    pub dest_chain: ChainId,
    /// Requesting account.
    pub originator: Address,
    /// Transport hints.
    pub params: AdapterParams,
}

/// What an adapter returns for an accepted dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Transport GUID or message id.
    pub transport_id: Hash,
    /// Native fee the transport charged.
    pub native_fee: U256,
}

/// Inbound payload forwarded by an adapter to the destination router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundPayload {
    /// Funds already released to the recipient.
    Transfer {
        /// Local asset.
        asset: Address,
        /// Amount released.
        amount: U256,
    },
    /// Opaque message.
    Message(Vec<u8>),
    /// Action bundle.
    Compose(Vec<ComposeAction>),
}

/// An operation arriving at its destination chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundDelivery {
    /// Id assigned by the source router.
    pub operation_id: OperationId,
    /// Chain the operation came from.
    pub source_chain: ChainId,
    /// Requesting account on the source chain.
    pub originator: Address,
    /// Local recipient.
    pub recipient: Address,
    /// Delivered content.
    pub payload: InboundPayload,
}

/// Result of handing an inbound delivery to its recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The recipient executed the delivery.
    Executed,
    /// The recipient refused or failed.
    Rejected(String),
}

impl DeliveryOutcome {
    /// Whether the delivery executed.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Router configuration.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Local chain id.
    pub chain_id: ChainId,
    /// Router's own address (ledger escrow account and adapter caller identity).
    pub router_address: Address,
    /// Registry capacity.
    pub max_adapters: usize,
}

impl RouterConfig {
    /// Config with the default registry capacity.
    #[must_use]
    pub fn new(chain_id: ChainId, router_address: Address) -> Self {
        Self {
            chain_id,
            router_address,
            max_adapters: super::invariants::DEFAULT_MAX_ADAPTERS,
        }
    }
}
