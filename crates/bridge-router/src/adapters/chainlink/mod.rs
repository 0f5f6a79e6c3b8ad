//! # Chainlink CCIP Adapter
//!
//! Bridge adapter over a CCIP router. Supports transfers, messages and
//! compose bundles. CCIP has no read primitive, so `StateRead` is refused.
//!
//! Protocol chain ids are translated to CCIP chain selectors per lane. Each
//! lane allow-lists exactly one sender: this adapter's counterpart on the
//! remote chain.

pub mod router;

pub use router::{
    Any2EvmMessage, CcipFeeSchedule, CcipNetwork, CcipReceiver, CcipRouterClient, Evm2AnyMessage,
    SimulatedCcipRouter,
};

use crate::adapters::codec::{
    decode_accepted, encode, BridgeMessage, ComposeBody, MessageBody, TransferBody, TAG_COMPOSE,
    TAG_MESSAGE, TAG_RECEIPT, TAG_TRANSFER,
};
use crate::adapters::delivery::{DeliveryHandler, ReplyChannel};
use crate::adapters::escrow::AdapterEscrow;
use crate::domain::{
    address_hex, invariant_valid_params, AdapterParams, Address, BridgeError, ChainId,
    ComposeAction, DispatchContext, DispatchReceipt, FeeEstimate, Hash, OperationId,
    OperationType, U256, ZERO_ADDRESS,
};
use crate::ports::inbound::RouterGateway;
use crate::ports::outbound::{AssetLedger, BridgeAdapter};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Default destination gas for `ccipReceive`.
pub const DEFAULT_CCIP_GAS: u64 = 200_000;

const ACCEPTED_TAGS: &[u8] = &[TAG_TRANSFER, TAG_MESSAGE, TAG_COMPOSE, TAG_RECEIPT];

/// One CCIP lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CcipLane {
    /// Remote chain selector.
    pub selector: u64,
    /// Allow-listed sender on the remote chain.
    pub peer: Address,
}

/// CCIP-backed adapter.
pub struct ChainlinkCcipAdapter {
    address: Address,
    router_address: Address,
    ccip: Arc<dyn CcipRouterClient>,
    lanes: RwLock<HashMap<ChainId, CcipLane>>,
    tokens: RwLock<HashMap<(ChainId, Address), Address>>,
    processed: Mutex<HashSet<Hash>>,
    escrow: AdapterEscrow,
    handler: DeliveryHandler,
    default_gas: u64,
}

impl ChainlinkCcipAdapter {
    /// Adapter at `address` serving the router at `router_address`.
    ///
    /// Outbound token transfers are locked in this adapter's account on `ledger`.
    pub fn new(
        address: Address,
        router_address: Address,
        ccip: Arc<dyn CcipRouterClient>,
        ledger: Arc<dyn AssetLedger>,
        router: Weak<dyn RouterGateway>,
    ) -> Self {
        Self {
            address,
            router_address,
            ccip,
            lanes: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            processed: Mutex::new(HashSet::new()),
            escrow: AdapterEscrow::new(address, router_address, "ccip", ledger),
            handler: DeliveryHandler::new(address, "ccip", router),
            default_gas: DEFAULT_CCIP_GAS,
        }
    }

    /// Open the lane to `chain` and allow-list `peer` as its sender.
    pub fn set_lane(&self, chain: ChainId, selector: u64, peer: Address) {
        self.lanes.write().insert(chain, CcipLane { selector, peer });
    }

    /// Map a local token to its counterpart on `chain`.
    pub fn map_token(&self, chain: ChainId, local: Address, remote: Address) {
        self.tokens.write().insert((chain, local), remote);
    }

    fn lane(&self, chain: ChainId) -> Result<CcipLane, BridgeError> {
        self.lanes
            .read()
            .get(&chain)
            .copied()
            .ok_or(BridgeError::UnsupportedChain(chain))
    }

    fn chain_for_selector(&self, selector: u64) -> Option<(ChainId, CcipLane)> {
        self.lanes
            .read()
            .iter()
            .find(|(_, lane)| lane.selector == selector)
            .map(|(chain, lane)| (*chain, *lane))
    }

    fn remote_token(&self, chain: ChainId, asset: &Address) -> Result<Address, BridgeError> {
        self.tokens
            .read()
            .get(&(chain, *asset))
            .copied()
            .ok_or(BridgeError::UnsupportedAsset {
                chain_id: chain,
                asset: *asset,
            })
    }

    fn gas(&self, params: &AdapterParams) -> u64 {
        params.gas_or(self.default_gas)
    }

    fn envelope(&self, lane: &CcipLane, message: &BridgeMessage, gas_limit: u64) -> Result<Evm2AnyMessage, BridgeError> {
        Ok(Evm2AnyMessage {
            receiver: lane.peer,
            data: encode(message)?,
            gas_limit,
        })
    }

    fn check_router_caller(&self, ctx: &DispatchContext) -> Result<(), BridgeError> {
        if ctx.caller != self.router_address {
            return Err(BridgeError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    async fn dispatch(&self, ctx: &DispatchContext, message: &BridgeMessage) -> Result<DispatchReceipt, BridgeError> {
        self.check_router_caller(ctx)?;
        let lane = self.lane(ctx.dest_chain)?;
        let envelope = self.envelope(&lane, message, self.gas(&ctx.params))?;

        let required = self.ccip.get_fee(lane.selector, &envelope).await?;
        if ctx.value < required {
            return Err(BridgeError::InsufficientFee {
                required,
                provided: ctx.value,
            });
        }

        let message_id = self
            .ccip
            .ccip_send(self.address, lane.selector, envelope, ctx.value)
            .await?;

        info!(
            op = %ctx.operation_id.short(),
            dest_chain = ctx.dest_chain,
            message_id = %hex::encode(&message_id[..4]),
            fee = %required,
            "[ccip] Message sent"
        );

        Ok(DispatchReceipt {
            transport_id: message_id,
            native_fee: required,
        })
    }
}

#[async_trait]
impl BridgeAdapter for ChainlinkCcipAdapter {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &str {
        "Chainlink CCIP"
    }

    fn supports_chain(&self, chain: ChainId) -> bool {
        self.lanes.read().contains_key(&chain)
    }

    fn supports_asset(&self, chain: ChainId, asset: &Address) -> bool {
        self.tokens.read().contains_key(&(chain, *asset))
    }

    fn supports_operation(&self, operation: OperationType) -> bool {
        operation != OperationType::StateRead
    }

    async fn estimate_fee(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        params: &AdapterParams,
        operation: OperationType,
    ) -> Result<FeeEstimate, BridgeError> {
        let lane = self.lane(dest_chain)?;
        invariant_valid_params(params)?;
        let filler = vec![0u8; params.calldata_size as usize];
        let operation_id = OperationId::default();
        let message = match operation {
            OperationType::TransferAsset => BridgeMessage::Transfer(TransferBody {
                operation_id,
                source_chain: 0,
                originator: ZERO_ADDRESS,
                recipient: ZERO_ADDRESS,
                asset: self.remote_token(dest_chain, asset)?,
                amount,
            }),
            OperationType::Message => BridgeMessage::Message(MessageBody {
                operation_id,
                source_chain: 0,
                originator: ZERO_ADDRESS,
                recipient: ZERO_ADDRESS,
                payload: filler,
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
            OperationType::StateRead => {
                return Err(BridgeError::OperationNotSupported(
                    "CCIP does not support STATE_READ".into(),
                ))
            }
        };

        let envelope = self.envelope(&lane, &message, self.gas(params))?;
        let native_fee = self.ccip.get_fee(lane.selector, &envelope).await?;
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
        self.check_router_caller(ctx)?;
        self.lane(ctx.dest_chain)?;
        let remote = self.remote_token(ctx.dest_chain, asset)?;
        let message = BridgeMessage::Transfer(TransferBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            recipient: *recipient,
            asset: remote,
            amount,
        });

        self.escrow.lock(asset, amount)?;
        let result = self.dispatch(ctx, &message).await;
        self.escrow.settle(asset, amount, result)
    }

    async fn send_message(
        &self,
        ctx: &DispatchContext,
        recipient: &Address,
        payload: &[u8],
    ) -> Result<DispatchReceipt, BridgeError> {
        let message = BridgeMessage::Message(MessageBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            recipient: *recipient,
            payload: payload.to_vec(),
        });
        self.dispatch(ctx, &message).await
    }

    async fn compose_actions(
        &self,
        ctx: &DispatchContext,
        actions: &[ComposeAction],
    ) -> Result<DispatchReceipt, BridgeError> {
        let message = BridgeMessage::Compose(ComposeBody {
            operation_id: ctx.operation_id,
            source_chain: ctx.source_chain,
            originator: ctx.originator,
            actions: actions.to_vec(),
        });
        self.dispatch(ctx, &message).await
    }
}

#[async_trait]
impl CcipReceiver for ChainlinkCcipAdapter {
    async fn ccip_receive(&self, caller: Address, message: Any2EvmMessage) -> Result<(), BridgeError> {
        if caller != self.ccip.address() {
            return Err(BridgeError::Unauthorized(caller));
        }

        let (source_chain, lane) = self
            .chain_for_selector(message.source_chain_selector)
            .ok_or_else(|| {
                BridgeError::TransportError(format!(
                    "no lane for selector {}",
                    message.source_chain_selector
                ))
            })?;
        if message.sender != lane.peer {
            warn!(
                sender = %address_hex(&message.sender),
                selector = message.source_chain_selector,
                "[ccip] Sender not allow-listed"
            );
            return Err(BridgeError::Unauthorized(message.sender));
        }
        if self.processed.lock().contains(&message.message_id) {
            return Err(BridgeError::DuplicateDelivery(message.message_id));
        }

        let decoded = decode_accepted(&message.data, ACCEPTED_TAGS)?;
        debug!(
            tag = decoded.tag(),
            op = %decoded.operation_id().short(),
            source_chain,
            "[ccip] Message admitted"
        );

        self.handler.handle(source_chain, decoded, self).await?;
        self.processed.lock().insert(message.message_id);
        Ok(())
    }
}

#[async_trait]
impl ReplyChannel for ChainlinkCcipAdapter {
    async fn reply(&self, dest_chain: ChainId, message: BridgeMessage) -> Result<(), BridgeError> {
        let lane = self.lane(dest_chain)?;
        let envelope = self.envelope(&lane, &message, self.default_gas)?;
        let fee = self.ccip.get_fee(lane.selector, &envelope).await?;
        self.ccip
            .ccip_send(self.address, lane.selector, envelope, fee)
            .await
            .map(|_| ())
    }
}
