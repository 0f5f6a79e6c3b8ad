//! # CCIP Router Client
//!
//! The `CcipRouterClient` port and its in-process simulation over a shared
//! [`CcipNetwork`].

use crate::domain::{address_hex, Address, BridgeError, Hash, U256};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Outbound CCIP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evm2AnyMessage {
    /// Receiving contract on the destination.
    pub receiver: Address,
    /// Application payload.
    pub data: Vec<u8>,
    /// Destination execution gas.
    pub gas_limit: u64,
}

/// Inbound CCIP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Any2EvmMessage {
    /// Message id.
    pub message_id: Hash,
    /// Source chain selector.
    pub source_chain_selector: u64,
    /// Sending contract on the source.
    pub sender: Address,
    /// Application payload.
    pub data: Vec<u8>,
}

/// CCIP router - outbound port.
#[async_trait]
pub trait CcipRouterClient: Send + Sync {
    /// Router contract address (the caller of `ccip_receive`).
    fn address(&self) -> Address;

    /// Local chain selector.
    fn chain_selector(&self) -> u64;

    /// Native fee for `message`.
    async fn get_fee(&self, dest_selector: u64, message: &Evm2AnyMessage) -> Result<U256, BridgeError>;

    /// Send `message`. Returns the message id.
    async fn ccip_send(
        &self,
        sender: Address,
        dest_selector: u64,
        message: Evm2AnyMessage,
        value: U256,
    ) -> Result<Hash, BridgeError>;
}

/// Application side of a CCIP router.
#[async_trait]
pub trait CcipReceiver: Send + Sync {
    /// Handle a message. `caller` is the delivering router.
    async fn ccip_receive(&self, caller: Address, message: Any2EvmMessage) -> Result<(), BridgeError>;
}

/// Router pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CcipFeeSchedule {
    /// Flat fee per message.
    pub base_fee: U256,
    /// Price per unit of destination gas.
    pub gas_price: U256,
    /// Price per payload byte.
    pub byte_price: U256,
}

impl Default for CcipFeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: U256::from(25_000u64),
            gas_price: U256::from(8u64),
            byte_price: U256::from(20u64),
        }
    }
}

#[derive(Clone, Debug)]
struct CcipPacket {
    dest_selector: u64,
    receiver: Address,
    message: Any2EvmMessage,
}

/// Shared in-memory CCIP lane set.
#[derive(Default)]
pub struct CcipNetwork {
    routers: RwLock<HashMap<u64, Weak<SimulatedCcipRouter>>>,
    queue: Mutex<VecDeque<CcipPacket>>,
}

impl CcipNetwork {
    /// Empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages waiting for execution.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Execute queued messages until none remain. Returns (executed, failed).
    pub async fn deliver_all(&self) -> (usize, usize) {
        let (mut executed, mut failed) = (0, 0);
        loop {
            let Some(packet) = self.queue.lock().pop_front() else {
                break;
            };
            match self.deliver(packet).await {
                Ok(()) => executed += 1,
                Err(_) => failed += 1,
            }
        }
        (executed, failed)
    }

    async fn deliver(&self, packet: CcipPacket) -> Result<(), BridgeError> {
        let router = self
            .routers
            .read()
            .get(&packet.dest_selector)
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                BridgeError::TransportError(format!("no router for selector {}", packet.dest_selector))
            })?;

        let message_id = packet.message.message_id;
        let result = router.execute(packet.receiver, packet.message).await;
        match &result {
            Ok(()) => debug!(id = %hex::encode(&message_id[..4]), "[ccip] Message executed"),
            Err(e) => warn!(id = %hex::encode(&message_id[..4]), error = %e, "[ccip] Execution failed"),
        }
        result
    }
}

/// In-process CCIP router.
pub struct SimulatedCcipRouter {
    address: Address,
    selector: u64,
    fees: CcipFeeSchedule,
    network: Arc<CcipNetwork>,
    receivers: RwLock<HashMap<Address, Weak<dyn CcipReceiver>>>,
    sequence: Mutex<u64>,
}

impl SimulatedCcipRouter {
    /// Create a router and attach it to `network`.
    pub fn new(
        address: Address,
        selector: u64,
        fees: CcipFeeSchedule,
        network: &Arc<CcipNetwork>,
    ) -> Arc<Self> {
        let router = Arc::new(Self {
            address,
            selector,
            fees,
            network: Arc::clone(network),
            receivers: RwLock::new(HashMap::new()),
            sequence: Mutex::new(0),
        });
        network
            .routers
            .write()
            .insert(selector, Arc::downgrade(&router));
        router
    }

    /// Route messages addressed to `address` to `receiver`.
    pub fn register_receiver(&self, address: Address, receiver: Weak<dyn CcipReceiver>) {
        self.receivers.write().insert(address, receiver);
    }

    async fn execute(&self, receiver: Address, message: Any2EvmMessage) -> Result<(), BridgeError> {
        let target = self
            .receivers
            .read()
            .get(&receiver)
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                BridgeError::TransportError(format!("no receiver at {}", address_hex(&receiver)))
            })?;
        target.ccip_receive(self.address, message).await
    }
}

#[async_trait]
impl CcipRouterClient for SimulatedCcipRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_selector(&self) -> u64 {
        self.selector
    }

    async fn get_fee(&self, dest_selector: u64, message: &Evm2AnyMessage) -> Result<U256, BridgeError> {
        if !self.network.routers.read().contains_key(&dest_selector) {
            return Err(BridgeError::TransportError(format!(
                "unsupported destination selector {dest_selector}"
            )));
        }
        Ok(self
            .fees
            .base_fee
            .saturating_add(self.fees.gas_price.saturating_mul(U256::from(message.gas_limit)))
            .saturating_add(self.fees.byte_price.saturating_mul(U256::from(message.data.len()))))
    }

    async fn ccip_send(
        &self,
        sender: Address,
        dest_selector: u64,
        message: Evm2AnyMessage,
        value: U256,
    ) -> Result<Hash, BridgeError> {
        let required = self.get_fee(dest_selector, &message).await?;
        if value < required {
            return Err(BridgeError::InsufficientMsgValue {
                required,
                provided: value,
            });
        }

        let sequence = {
            let mut seq = self.sequence.lock();
            *seq += 1;
            *seq
        };

        let mut hasher = Keccak256::new();
        hasher.update(self.selector.to_be_bytes());
        hasher.update(dest_selector.to_be_bytes());
        hasher.update(sender);
        hasher.update(message.receiver);
        hasher.update(sequence.to_be_bytes());
        hasher.update(&message.data);
        let mut message_id = [0u8; 32];
        message_id.copy_from_slice(&hasher.finalize());

        self.network.queue.lock().push_back(CcipPacket {
            dest_selector,
            receiver: message.receiver,
            message: Any2EvmMessage {
                message_id,
                source_chain_selector: self.selector,
                sender,
                data: message.data,
            },
        });

        Ok(message_id)
    }
}
