//! LayerZero application core shared by the LayerZero and Stargate adapters:
//! route table, trusted peers, option building, paid sends and inbound
//! packet admission.

use super::endpoint::{LayerZeroEndpoint, MessagingReceipt, Origin};
use super::options::{parse_options, value_to_u128, OptionsBuilder};
use crate::adapters::codec::{encode, BridgeMessage};
use crate::adapters::delivery::ReplyChannel;
use crate::domain::{
    address_hex, AdapterParams, Address, BridgeError, ChainId, DispatchContext, DispatchReceipt,
    Hash, U256,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Default destination gas for `lzReceive`.
pub const DEFAULT_LZ_GAS: u64 = 200_000;

/// Route to one remote chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LzRoute {
    /// Remote endpoint id.
    pub eid: u32,
    /// Trusted application on the remote chain.
    pub peer: Address,
}

/// Application state bound to one endpoint.
pub struct LzApp {
    address: Address,
    router_address: Address,
    component: &'static str,
    endpoint: Arc<dyn LayerZeroEndpoint>,
    routes: RwLock<HashMap<ChainId, LzRoute>>,
    delivered: Mutex<HashSet<Hash>>,
    default_gas: u64,
}

impl LzApp {
    /// Application at `address`, dispatching only for `router_address`.
    pub fn new(
        address: Address,
        router_address: Address,
        component: &'static str,
        endpoint: Arc<dyn LayerZeroEndpoint>,
    ) -> Self {
        Self {
            address,
            router_address,
            component,
            endpoint,
            routes: RwLock::new(HashMap::new()),
            delivered: Mutex::new(HashSet::new()),
            default_gas: DEFAULT_LZ_GAS,
        }
    }

    /// Application address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Configure the route to `chain`.
    pub fn set_route(&self, chain: ChainId, eid: u32, peer: Address) {
        self.routes.write().insert(chain, LzRoute { eid, peer });
    }

    /// Route to `chain`, if configured.
    pub fn route(&self, chain: ChainId) -> Result<LzRoute, BridgeError> {
        self.routes
            .read()
            .get(&chain)
            .copied()
            .ok_or(BridgeError::UnsupportedChain(chain))
    }

    /// Whether `chain` is reachable.
    pub fn supports_chain(&self, chain: ChainId) -> bool {
        self.routes.read().contains_key(&chain)
    }

    /// Dispatches are accepted from the configured router only.
    pub fn check_router_caller(&self, ctx: &DispatchContext) -> Result<(), BridgeError> {
        if ctx.caller != self.router_address {
            return Err(BridgeError::Unauthorized(ctx.caller));
        }
        Ok(())
    }

    fn gas(&self, params: &AdapterParams) -> u128 {
        u128::from(params.gas_or(self.default_gas))
    }

    /// `lzReceive` options for `params`, or its pre-encoded options once validated.
    pub fn receive_options(&self, params: &AdapterParams) -> Result<Vec<u8>, BridgeError> {
        if !params.options.is_empty() {
            parse_options(&params.options)?;
            return Ok(params.options.clone());
        }
        Ok(OptionsBuilder::new()
            .add_lz_receive(self.gas(params), value_to_u128(params.msg_value)?)
            .build())
    }

    /// `lzRead` options for `params`.
    pub fn read_options(&self, params: &AdapterParams) -> Result<Vec<u8>, BridgeError> {
        if !params.options.is_empty() {
            parse_options(&params.options)?;
            return Ok(params.options.clone());
        }
        Ok(OptionsBuilder::new()
            .add_lz_read(
                self.gas(params),
                params.calldata_size,
                value_to_u128(params.msg_value)?,
            )
            .build())
    }

    /// Endpoint quote for `message` to `chain`.
    pub async fn quote(
        &self,
        chain: ChainId,
        message: &BridgeMessage,
        options: &[u8],
    ) -> Result<U256, BridgeError> {
        let route = self.route(chain)?;
        let bytes = encode(message)?;
        self.endpoint.quote(route.eid, &bytes, options).await
    }

    /// Send a dispatch, charging the caller's attached value.
    pub async fn dispatch(
        &self,
        ctx: &DispatchContext,
        message: &BridgeMessage,
        options: Vec<u8>,
    ) -> Result<DispatchReceipt, BridgeError> {
        let route = self.route(ctx.dest_chain)?;
        let bytes = encode(message)?;
        let required = self.endpoint.quote(route.eid, &bytes, &options).await?;
        if ctx.value < required {
            return Err(BridgeError::InsufficientFee {
                required,
                provided: ctx.value,
            });
        }

        let receipt = self
            .endpoint
            .send(self.address, route.eid, route.peer, bytes, options, ctx.value)
            .await?;

        info!(
            op = %ctx.operation_id.short(),
            dest_chain = ctx.dest_chain,
            guid = %hex::encode(&receipt.guid[..4]),
            fee = %required,
            "[{}] Packet sent",
            self.component
        );

        Ok(DispatchReceipt {
            transport_id: receipt.guid,
            native_fee: required,
        })
    }

    async fn send_paid(
        &self,
        chain: ChainId,
        message: &BridgeMessage,
    ) -> Result<MessagingReceipt, BridgeError> {
        let route = self.route(chain)?;
        let bytes = encode(message)?;
        let options = OptionsBuilder::new()
            .add_lz_receive(u128::from(self.default_gas), 0)
            .build();
        let fee = self.endpoint.quote(route.eid, &bytes, &options).await?;
        self.endpoint
            .send(self.address, route.eid, route.peer, bytes, options, fee)
            .await
    }

    /// Admit an inbound packet: endpoint caller, trusted peer, first delivery.
    ///
    /// Returns the source chain.
    pub fn admit(&self, caller: Address, origin: &Origin, guid: &Hash) -> Result<ChainId, BridgeError> {
        if caller != self.endpoint.address() {
            return Err(BridgeError::Unauthorized(caller));
        }

        let source_chain = self
            .routes
            .read()
            .iter()
            .find(|(_, route)| route.eid == origin.src_eid)
            .map(|(chain, route)| (*chain, route.peer));
        let (source_chain, peer) = source_chain.ok_or_else(|| {
            BridgeError::TransportError(format!("no route for eid {}", origin.src_eid))
        })?;

        if origin.sender != peer {
            warn!(
                sender = %address_hex(&origin.sender),
                src_eid = origin.src_eid,
                "[{}] Packet from untrusted peer",
                self.component
            );
            return Err(BridgeError::Unauthorized(origin.sender));
        }

        if self.delivered.lock().contains(guid) {
            return Err(BridgeError::DuplicateDelivery(*guid));
        }
        Ok(source_chain)
    }

    /// Record a successfully processed packet.
    pub fn mark_delivered(&self, guid: Hash) {
        self.delivered.lock().insert(guid);
    }
}

#[async_trait]
impl ReplyChannel for LzApp {
    async fn reply(&self, dest_chain: ChainId, message: BridgeMessage) -> Result<(), BridgeError> {
        self.send_paid(dest_chain, &message).await.map(|_| ())
    }
}
