//! # LayerZero Adapter
//!
//! Bridge adapter over a LayerZero endpoint. Supports all four operation
//! types: transfers (lock on source, release from adapter liquidity on the
//! destination), messages, compose bundles and `lzRead` state reads.
//!
//! ```text
//! BridgeRouter ──dispatch──→ LayerZeroAdapter ──send──→ Endpoint ─┐
//!                                                                 │ network
//! BridgeRouter ←─callbacks── LayerZeroAdapter ←─lz_receive── Endpoint ←┘
//! ```

pub mod app;
pub mod endpoint;
pub mod options;

pub use app::{LzApp, LzRoute, DEFAULT_LZ_GAS};
pub use endpoint::{
    DeliveryReport, LayerZeroEndpoint, LayerZeroNetwork, LzFeeSchedule, LzPacket, LzReceiver,
    MessagingReceipt, Origin, SimulatedLayerZeroEndpoint,
};
pub use options::{parse_options, summarize, ExecutionBudget, ExecutorOption, OptionsBuilder};

use crate::adapters::codec::{
    decode_accepted, BridgeMessage, ComposeBody, MessageBody, ReadRequestBody, TransferBody,
    ALL_TAGS,
};
use crate::adapters::delivery::DeliveryHandler;
use crate::adapters::escrow::AdapterEscrow;
use crate::domain::{
    invariant_valid_params, AdapterParams, Address, BridgeError, ChainId, ComposeAction,
    DispatchContext, DispatchReceipt, FeeEstimate, Hash, OperationId, OperationType, U256, ZERO_ADDRESS,
};
use crate::ports::inbound::RouterGateway;
use crate::ports::outbound::{AssetLedger, BridgeAdapter, StateReader};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Full-featured LayerZero adapter.
pub struct LayerZeroAdapter {
    app: LzApp,
    assets: RwLock<HashMap<(ChainId, Address), Address>>,
    escrow: AdapterEscrow,
    handler: DeliveryHandler,
}

impl LayerZeroAdapter {
    /// Adapter at `address` serving the router at `router_address`.
    ///
    /// Outbound transfers are locked in this adapter's account on `ledger`.
    pub fn new(
        address: Address,
        router_address: Address,
        endpoint: Arc<dyn LayerZeroEndpoint>,
        ledger: Arc<dyn AssetLedger>,
        router: Weak<dyn RouterGateway>,
    ) -> Self {
        Self {
            app: LzApp::new(address, router_address, "lz", endpoint),
            assets: RwLock::new(HashMap::new()),
            escrow: AdapterEscrow::new(address, router_address, "lz", ledger),
            handler: DeliveryHandler::new(address, "lz", router),
        }
    }

    /// Serve inbound reads from `reader`.
    pub fn with_state_reader(mut self, reader: Arc<dyn StateReader>) -> Self {
        self.handler = self.handler.with_state_reader(reader);
        self
    }

    /// Trust `peer` at endpoint `eid` as this adapter's counterpart on `chain`.
    pub fn set_peer(&self, chain: ChainId, eid: u32, peer: Address) {
        self.app.set_route(chain, eid, peer);
    }

    /// Map a local asset to its counterpart on `chain`.
    pub fn map_asset(&self, chain: ChainId, local: Address, remote: Address) {
        self.assets.write().insert((chain, local), remote);
    }

    fn remote_asset(&self, chain: ChainId, asset: &Address) -> Result<Address, BridgeError> {
        self.assets
            .read()
            .get(&(chain, *asset))
            .copied()
            .ok_or(BridgeError::UnsupportedAsset {
                chain_id: chain,
                asset: *asset,
            })
    }

    /// Message of the shape `operation` would send, for quoting.
    ///
    /// Variable parts are sized by `params.calldata_size`.
    fn quote_message(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        params: &AdapterParams,
        operation: OperationType,
    ) -> Result<BridgeMessage, BridgeError> {
        invariant_valid_params(params)?;
        let filler = vec![0u8; params.calldata_size as usize];
        let operation_id = OperationId::default();
        Ok(match operation {
            OperationType::TransferAsset => BridgeMessage::Transfer(TransferBody {
                operation_id,
                source_chain: 0,
                originator: ZERO_ADDRESS,
                recipient: ZERO_ADDRESS,
                asset: self.remote_asset(dest_chain, asset)?,
                amount,
            }),
            OperationType::Message => BridgeMessage::Message(MessageBody {
                operation_id,
                source_chain: 0,
                originator: ZERO_ADDRESS,
                recipient: ZERO_ADDRESS,
                payload: filler,
            }),
            OperationType::StateRead => BridgeMessage::ReadRequest(ReadRequestBody {
                operation_id,
                source_chain: 0,
                target: ZERO_ADDRESS,
                selector: [0u8; 4],
                call_data: filler,
            }),
            OperationType::Compose => BridgeMessage::Compose(ComposeBody {
                operation_id,
                source_chain: 0,
                originator: ZERO_ADDRESS,
                actions: vec![ComposeAction {
                    target: ZERO_ADDRESS,
                    payload: filler,
                }],
            }),
        })
    }
}

#[async_trait]
impl BridgeAdapter for LayerZeroAdapter {
    fn address(&self) -> Address {
        self.app.address()
    }

    fn name(&self) -> &str {
        "LayerZero"
    }

    fn supports_chain(&self, chain: ChainId) -> bool {
        self.app.supports_chain(chain)
    }

    fn supports_asset(&self, chain: ChainId, asset: &Address) -> bool {
        self.assets.read().contains_key(&(chain, *asset))
    }

    fn supports_operation(&self, _operation: OperationType) -> bool {
        true
    }

    async fn estimate_fee(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        params: &AdapterParams,
        operation: OperationType,
    ) -> Result<FeeEstimate, BridgeError> {
        self.app.route(dest_chain)?;
        let message = self.quote_message(dest_chain, asset, amount, params, operation)?;
        let options = match operation {
            OperationType::StateRead => self.app.read_options(params)?,
            _ => self.app.receive_options(params)?,
        };
        let native_fee = self.app.quote(dest_chain, &message, &options).await?;
        Ok(FeeEstimate {
            native_fee,
            token_fee: U256::zero(),
        })
    }

    async fn transfer_asset(
        &self,
        ctx: &DispatchContext,
        asset: &Address,
        amount: U256,
        recipient: &Address,
    ) -> Result<DispatchReceipt, BridgeError> {
        self.app.check_router_caller(ctx)?;
        self.app.route(ctx.dest_chain)?;
        let remote = self.remote_asset(ctx.dest_chain, asset)?;

        let message = BridgeMessage::Transfer(TransferBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            recipient: *recipient,
            asset: remote,
            amount,
        });
        let options = self.app.receive_options(&ctx.params)?;

        self.escrow.lock(asset, amount)?;
        let result = self.app.dispatch(ctx, &message, options).await;
        self.escrow.settle(asset, amount, result)
    }

    async fn send_message(
        &self,
        ctx: &DispatchContext,
        recipient: &Address,
        payload: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        self.app.check_router_caller(ctx)?;
        let message = BridgeMessage::Message(MessageBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            recipient: *recipient,
            payload: payload.to_vec(),
        });
        let options = self.app.receive_options(&ctx.params)?;
        self.app.dispatch(ctx, &message, options).await
    }

    async fn read_state(
        &self,
        ctx: &DispatchContext,
        target: &Address,
        selector: [u8; 4],
        call_data: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        self.app.check_router_caller(ctx)?;
        let message = BridgeMessage::ReadRequest(ReadRequestBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            target: *target,
            selector,
            call_data: call_data.to_vec(),
        });
        let options = self.app.read_options(&ctx.params)?;
        self.app.dispatch(ctx, &message, options).await
    }

    async fn compose_actions(
        &self,
        ctx: &DispatchContext,
        actions: &[ComposeAction],
    ) -> Result<DispatchReceipt, BridgeError> {
        self.app.check_router_caller(ctx)?;
        let message = BridgeMessage::Compose(ComposeBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            actions: actions.to_vec(),
        });
        let options = self.app.receive_options(&ctx.params)?;
        self.app.dispatch(ctx, &message, options).await
    }
}

#[async_trait]
impl LzReceiver for LayerZeroAdapter {
    async fn lz_receive(
        &self,
        caller: Address,
        origin: Origin,
        guid: Hash,
        message: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let source_chain = self.app.admit(caller, &origin, &guid)?;
        let message = decode_accepted(&message, ALL_TAGS)?;
        debug!(
            tag = message.tag(),
            op = %message.operation_id().short(),
            source_chain,
            "[lz] Packet admitted"
        );

        self.handler.handle(source_chain, message, &self.app).await?;
        self.app.mark_delivered(guid);
        Ok(())
    }
}
