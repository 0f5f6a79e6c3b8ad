//! # Stargate Adapter
//!
//! Transfer-only binding over the LayerZero endpoint. Each pool charges a
//! token fee in basis points, deducted from the delivered amount. The full
//! amount, fee included, is locked in the pool account on the source chain.

use crate::adapters::codec::{decode_accepted, BridgeMessage, TransferBody, TAG_RECEIPT, TAG_TRANSFER};
use crate::adapters::delivery::DeliveryHandler;
use crate::adapters::escrow::AdapterEscrow;
use crate::adapters::layerzero::{LayerZeroEndpoint, LzApp, LzReceiver, Origin};
use crate::domain::{
    AdapterParams, Address, BridgeError, ChainId, DispatchContext, DispatchReceipt, FeeEstimate,
    Hash, OperationId, OperationType, U256, ZERO_ADDRESS,
};
use crate::ports::inbound::RouterGateway;
use crate::ports::outbound::{AssetLedger, BridgeAdapter};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Basis point denominator.
pub const BPS_DENOMINATOR: u64 = 10_000;

const ACCEPTED_TAGS: &[u8] = &[TAG_TRANSFER, TAG_RECEIPT];

/// A pool on one route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StargatePool {
    /// Asset on the destination chain.
    pub remote_asset: Address,
    /// Token fee in basis points.
    pub fee_bps: u32,
}

/// Stargate pool bridge.
pub struct StargateAdapter {
    app: LzApp,
    pools: RwLock<HashMap<(ChainId, Address), StargatePool>>,
    escrow: AdapterEscrow,
    handler: DeliveryHandler,
}

impl StargateAdapter {
    /// Adapter at `address` serving the router at `router_address`.
    pub fn new(
        address: Address,
        router_address: Address,
        endpoint: Arc<dyn LayerZeroEndpoint>,
        ledger: Arc<dyn AssetLedger>,
        router: Weak<dyn RouterGateway>,
    ) -> Self {
        Self {
            app: LzApp::new(address, router_address, "stargate", endpoint),
            pools: RwLock::new(HashMap::new()),
            escrow: AdapterEscrow::new(address, router_address, "stargate", ledger),
            handler: DeliveryHandler::new(address, "stargate", router),
        }
    }

    /// Trust `peer` at endpoint `eid` as the counterpart on `chain`.
    pub fn set_peer(&self, chain: ChainId, eid: u32, peer: Address) {
        self.app.set_route(chain, eid, peer);
    }

    /// Open a pool moving `local` to `remote` on `chain`.
    pub fn add_pool(&self, chain: ChainId, local: Address, remote: Address, fee_bps: u32) {
        self.pools.write().insert(
            (chain, local),
            StargatePool {
                remote_asset: remote,
                fee_bps,
            },
        );
    }

    fn pool(&self, chain: ChainId, asset: &Address) -> Result<StargatePool, BridgeError> {
        self.pools
            .read()
            .get(&(chain, *asset))
            .copied()
            .ok_or(BridgeError::UnsupportedAsset {
                chain_id: chain,
                asset: *asset,
            })
    }

    fn not_supported(operation: OperationType) -> BridgeError {
        BridgeError::OperationNotSupported(format!("Stargate does not support {operation}"))
    }
}

/// Token fee taken by a pool.
pub fn pool_fee(amount: U256, fee_bps: u32) -> U256 {
    amount.saturating_mul(U256::from(fee_bps)) / U256::from(BPS_DENOMINATOR)
}

#[async_trait]
impl BridgeAdapter for StargateAdapter {
    fn address(&self) -> Address {
        self.app.address()
    }

    fn name(&self) -> &str {
        "Stargate"
    }

    fn supports_chain(&self, chain: ChainId) -> bool {
        self.app.supports_chain(chain)
    }

    fn supports_asset(&self, chain: ChainId, asset: &Address) -> bool {
        self.pools.read().contains_key(&(chain, *asset))
    }

    fn supports_operation(&self, operation: OperationType) -> bool {
        operation == OperationType::TransferAsset
    }

    async fn estimate_fee(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        params: &AdapterParams,
        operation: OperationType,
    ) -> Result<FeeEstimate, BridgeError> {
        if operation != OperationType::TransferAsset {
            return Err(Self::not_supported(operation));
        }
        self.app.route(dest_chain)?;
        let pool = self.pool(dest_chain, asset)?;
        let token_fee = pool_fee(amount, pool.fee_bps);

        let message = BridgeMessage::Transfer(TransferBody {
            operation_id: OperationId::default(),
            source_chain: 0,
            originator: ZERO_ADDRESS,
            recipient: ZERO_ADDRESS,
            asset: pool.remote_asset,
            amount: amount.saturating_sub(token_fee),
        });
        let options = self.app.receive_options(params)?;
        let native_fee = self.app.quote(dest_chain, &message, &options).await?;

        Ok(FeeEstimate {
            native_fee,
            token_fee,
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
        let pool = self.pool(ctx.dest_chain, asset)?;
        let token_fee = pool_fee(amount, pool.fee_bps);

        let message = BridgeMessage::Transfer(TransferBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            recipient: *recipient,
            asset: pool.remote_asset,
            amount: amount.saturating_sub(token_fee),
        });
        debug!(
            op = %ctx.operation_id.short(),
            token_fee = %token_fee,
            "[stargate] Pool fee deducted"
        );

        let options = self.app.receive_options(&ctx.params)?;

        self.escrow.lock(asset, amount)?;
        let result = self.app.dispatch(ctx, &message, options).await;
        self.escrow.settle(asset, amount, result)
    }

    async fn send_message(
        &self,
        _ctx: &DispatchContext,
        _recipient: &Address,
        _payload: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        Err(Self::not_supported(OperationType::Message))
    }

    async fn read_state(
        &self,
        _ctx: &DispatchContext,
        _target: &Address,
        _selector: [u8; 4],
        _call_data: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        Err(Self::not_supported(OperationType::StateRead))
    }

    async fn compose_actions(
        &self,
        _ctx: &DispatchContext,
        _actions: &[crate::domain::ComposeAction],
    ) -> Result<DispatchReceipt, BridgeError> {
        Err(Self::not_supported(OperationType::Compose))
    }
}

#[async_trait]
impl LzReceiver for StargateAdapter {
    async fn lz_receive(
        &self,
        caller: Address,
        origin: Origin,
        guid: Hash,
        message: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let source_chain = self.app.admit(caller, &origin, &guid)?;
        let message = decode_accepted(&message, ACCEPTED_TAGS)?;
        self.handler.handle(source_chain, message, &self.app).await?;
        self.app.mark_delivered(guid);
        Ok(())
    }
}
