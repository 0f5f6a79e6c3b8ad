//! # Outbound Ports
//!
//! Traits for the router's dependencies: bridge adapters, access control,
//! the asset ledger, persistence, receiver contracts, destination state and time.

use crate::domain::{
    AdapterParams, Address, BridgeError, ChainId, ComposeAction, DispatchContext,
    DispatchReceipt, FeeEstimate, Operation, OperationId, OperationType, U256,
};
use async_trait::async_trait;

/// Bridge adapter - outbound port.
///
/// Wraps one cross-chain transport. Dispatch methods require the caller
/// recorded in the [`DispatchContext`] to be the adapter's configured router
/// and the attached value to cover the adapter's fee.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Adapter address (registry key).
    fn address(&self) -> Address;

    /// Human readable transport name.
    fn name(&self) -> &str;

    /// Whether the adapter can reach `chain`.
    fn supports_chain(&self, chain: ChainId) -> bool;

    /// Whether `asset` can be moved to `chain`.
    fn supports_asset(&self, chain: ChainId, asset: &Address) -> bool;

    /// Whether the adapter implements `operation`.
    fn supports_operation(&self, operation: OperationType) -> bool;

    /// Quote the fee for an operation.
    ///
    /// Never returns a quote for an unsupported target. The native fee is
    /// non-decreasing in an explicit `params.gas_limit`, zero included.
    async fn estimate_fee(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        params: &AdapterParams,
        operation: OperationType,
    ) -> Result<FeeEstimate, BridgeError>;

    /// Move `amount` of `asset` to `recipient` on the destination chain.
    ///
    /// Pulls `amount` from the router into the adapter's account first and
    /// returns it if the send fails.
    async fn transfer_asset(
        &self,
        ctx: &DispatchContext,
        asset: &Address,
        amount: U256,
        recipient: &Address,
    ) -> Result<DispatchReceipt, BridgeError>;

    /// Deliver an opaque payload to `recipient`.
    async fn send_message(
        &self,
        ctx: &DispatchContext,
        recipient: &Address,
        payload: &[u8],
    ) -> Result<DispatchReceipt, BridgeError>;

    /// Read state on the destination and route the response back.
    async fn read_state(
        &self,
        _ctx: &DispatchContext,
        _target: &Address,
        _selector: [u8; 4],
        _call_data: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        Err(BridgeError::OperationNotSupported(format!(
            "{} does not support state reads",
            self.name()
        )))
    }

    /// Execute an action bundle on the destination.
    async fn compose_actions(
        &self,
        _ctx: &DispatchContext,
        _actions: &[ComposeAction],
    ) -> Result<DispatchReceipt, BridgeError> {
        Err(BridgeError::OperationNotSupported(format!(
            "{} does not support compose",
            self.name()
        )))
    }
}

/// Role lookup - outbound port.
pub trait AccessControl: Send + Sync {
    /// Governor may manage adapters, pause and unpause.
    fn is_governor(&self, account: &Address) -> bool;

    /// Guardian may pause.
    fn is_guardian(&self, account: &Address) -> bool;
}

/// Fungible asset balances - outbound port.
pub trait AssetLedger: Send + Sync {
    /// Move `amount` of `asset` from one account to another.
    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), BridgeError>;

    /// Balance of `holder`.
    fn balance_of(&self, asset: &Address, holder: &Address) -> U256;
}

/// Router persistence - outbound port.
///
/// Operation records are never deleted.
pub trait OperationStore: Send + Sync {
    /// Load an operation.
    fn get_operation(&self, id: &OperationId) -> Result<Option<Operation>, BridgeError>;

    /// Overwrite an existing operation.
    fn put_operation(&self, operation: &Operation) -> Result<(), BridgeError>;

    /// Insert a freshly dispatched operation and advance the nonce, atomically.
    fn commit_dispatch(&self, operation: &Operation, next_nonce: u64) -> Result<(), BridgeError>;

    /// Nonce for the next dispatch.
    fn next_nonce(&self) -> Result<u64, BridgeError>;

    /// Pause flag.
    fn is_paused(&self) -> Result<bool, BridgeError>;

    /// Set the pause flag.
    fn set_paused(&self, paused: bool) -> Result<(), BridgeError>;

    /// Mark an inbound operation as processed. Returns `false` if already marked.
    fn mark_inbound(&self, id: &OperationId) -> Result<bool, BridgeError>;
}

/// Contract-side callbacks - outbound port.
///
/// Stands in for the code deployed at a receiving address.
#[async_trait]
pub trait BridgeReceiver: Send + Sync {
    /// A state read this account requested has been answered.
    async fn on_read_response(
        &self,
        operation_id: OperationId,
        data: &[u8],
    ) -> Result<(), BridgeError>;

    /// A message addressed to this account arrived.
    async fn on_message_received(
        &self,
        operation_id: OperationId,
        source_chain: ChainId,
        originator: &Address,
        payload: &[u8],
    ) -> Result<(), BridgeError>;

    /// A compose bundle sent by this account arrived. All or nothing.
    async fn on_compose(
        &self,
        _operation_id: OperationId,
        _source_chain: ChainId,
        _actions: &[ComposeAction],
    ) -> Result<(), BridgeError> {
        Err(BridgeError::OperationNotSupported("compose".into()))
    }

    /// Funds were released to this account.
    async fn on_asset_received(
        &self,
        _operation_id: OperationId,
        _source_chain: ChainId,
        _asset: &Address,
        _amount: U256,
    ) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Destination-side state access - outbound port.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Execute a read-only call.
    async fn read(
        &self,
        target: &Address,
        selector: [u8; 4],
        call_data: &[u8],
    ) -> Result<Vec<u8>, BridgeError>;
}

/// Block time - outbound port.
pub trait Clock: Send + Sync {
    /// Current timestamp in seconds.
    fn now(&self) -> u64;
}
