//! # Inbound Ports
//!
//! What the router offers: the user/admin surface and the adapter callback
//! surface.

use crate::domain::{
    Address, BridgeError, BridgeOptions, CallContext, ChainId, ComposeRequest, DeliveryOutcome,
    FeeQuote, InboundDelivery, MessageRequest, Operation, OperationId, OperationStatus,
    OperationType, ReadRequest, TransferRequest, U256,
};
use crate::ports::outbound::{BridgeAdapter, BridgeReceiver};
use async_trait::async_trait;
use std::sync::Arc;

/// Bridge router API - inbound port.
#[async_trait]
pub trait BridgeRouterApi: Send + Sync {
    // === Registry ===

    /// Append an adapter. Governor only.
    async fn register_adapter(
        &self,
        ctx: &CallContext,
        adapter: Arc<dyn BridgeAdapter>,
    ) -> Result<(), BridgeError>;

    /// Remove an adapter, preserving the order of the rest. Governor only.
    async fn remove_adapter(&self, ctx: &CallContext, adapter: Address)
        -> Result<(), BridgeError>;

    /// Registered adapters in registration order.
    fn get_adapters(&self) -> Vec<Address>;

    /// Whether `adapter` is registered.
    fn is_valid_adapter(&self, adapter: &Address) -> bool;

    // === Selection ===

    /// Cheapest adapter able to serve the route.
    async fn get_best_adapter(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        operation: OperationType,
    ) -> Result<Address, BridgeError>;

    /// Fee for an operation, with the adapter it was computed for.
    async fn quote(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        options: &BridgeOptions,
        operation: OperationType,
    ) -> Result<FeeQuote, BridgeError>;

    // === Dispatch ===

    /// Send an asset to another chain.
    async fn transfer_assets(
        &self,
        ctx: &CallContext,
        request: TransferRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError>;

    /// Read state on another chain.
    async fn read_state(
        &self,
        ctx: &CallContext,
        request: ReadRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError>;

    /// Send a message to another chain.
    async fn send_message(
        &self,
        ctx: &CallContext,
        request: MessageRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError>;

    /// Execute an action bundle on another chain.
    async fn compose_actions(
        &self,
        ctx: &CallContext,
        request: ComposeRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError>;

    // === Admin ===

    /// Block new operations. Guardian or governor.
    async fn pause(&self, ctx: &CallContext) -> Result<(), BridgeError>;

    /// Accept new operations again. Governor only.
    async fn unpause(&self, ctx: &CallContext) -> Result<(), BridgeError>;

    // === Queries ===

    /// Pause flag.
    fn is_paused(&self) -> Result<bool, BridgeError>;

    /// Full operation record.
    fn operation(&self, id: &OperationId) -> Result<Option<Operation>, BridgeError>;

    /// Operation status.
    fn operation_status(&self, id: &OperationId) -> Result<OperationStatus, BridgeError>;

    /// Adapter assigned to an operation.
    fn operation_to_adapter(&self, id: &OperationId) -> Result<Address, BridgeError>;

    /// Originator awaiting a state read.
    fn read_request_originator(&self, id: &OperationId) -> Result<Address, BridgeError>;

    /// Delivered read response, if any.
    fn read_response(&self, id: &OperationId) -> Result<Option<Vec<u8>>, BridgeError>;

    /// Attach the callback handle for the contract at `address`.
    fn bind_receiver(&self, address: Address, receiver: Arc<dyn BridgeReceiver>);
}

/// Adapter callback surface - inbound port.
///
/// Adapters hold this behind a `Weak` so the router owns its adapters and
/// not the other way around.
#[async_trait]
pub trait RouterGateway: Send + Sync {
    /// Local chain id.
    fn chain_id(&self) -> ChainId;

    /// Move an operation forward in its state machine.
    async fn update_operation_status(
        &self,
        caller: Address,
        id: OperationId,
        status: OperationStatus,
    ) -> Result<(), BridgeError>;

    /// Complete a state read and notify its originator.
    async fn deliver_read_response(
        &self,
        caller: Address,
        id: OperationId,
        data: Vec<u8>,
    ) -> Result<(), BridgeError>;

    /// Hand an inbound operation to its local recipient.
    async fn notify_message_received(
        &self,
        caller: Address,
        delivery: InboundDelivery,
    ) -> Result<DeliveryOutcome, BridgeError>;
}
