//! # LayerZero Endpoint
//!
//! The `LayerZeroEndpoint` port and an in-process simulation of it.
//!
//! Every simulated endpoint attaches to a shared [`LayerZeroNetwork`], which
//! queues sent packets until a test or relayer delivers them. Delivery can be
//! in order, reversed, or a replay of an already delivered packet.

use super::options::{parse_options, summarize};
use crate::domain::{address_hex, Address, BridgeError, Hash, U256};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Where an inbound packet came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Source endpoint id.
    pub src_eid: u32,
    /// Sending application on the source chain.
    pub sender: Address,
    /// Path nonce.
    pub nonce: u64,
}

/// Accepted send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessagingReceipt {
    /// Globally unique packet id.
    pub guid: Hash,
    /// Path nonce.
    pub nonce: u64,
    /// Fee charged.
    pub native_fee: U256,
}

/// LayerZero endpoint - outbound port.
#[async_trait]
pub trait LayerZeroEndpoint: Send + Sync {
    /// Endpoint contract address (the caller of `lz_receive`).
    fn address(&self) -> Address;

    /// Local endpoint id.
    fn eid(&self) -> u32;

    /// Native fee for sending `message` with `options`.
    async fn quote(&self, dst_eid: u32, message: &[u8], options: &[u8]) -> Result<U256, BridgeError>;

    /// Send a packet. `value` must cover the quote.
    async fn send(
        &self,
        sender: Address,
        dst_eid: u32,
        receiver: Address,
        message: Vec<u8>,
        options: Vec<u8>,
        value: U256,
    ) -> Result<MessagingReceipt, BridgeError>;
}

/// Application side of an endpoint.
#[async_trait]
pub trait LzReceiver: Send + Sync {
    /// Handle a verified packet. `caller` is the delivering endpoint.
    async fn lz_receive(
        &self,
        caller: Address,
        origin: Origin,
        guid: Hash,
        message: Vec<u8>,
    ) -> Result<(), BridgeError>;
}

/// Endpoint pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LzFeeSchedule {
    /// Flat fee per packet.
    pub base_fee: U256,
    /// Price per unit of destination gas.
    pub gas_price: U256,
    /// Price per message byte and per declared calldata byte.
    pub byte_price: U256,
}

impl Default for LzFeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: U256::from(10_000u64),
            gas_price: U256::from(10u64),
            byte_price: U256::from(16u64),
        }
    }
}

/// A packet in flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LzPacket {
    /// Source of the packet.
    pub origin: Origin,
    /// Destination endpoint id.
    pub dst_eid: u32,
    /// Receiving application.
    pub receiver: Address,
    /// Packet id.
    pub guid: Hash,
    /// Application payload.
    pub message: Vec<u8>,
}

/// Outcome of a batch delivery.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Packets accepted by their receiver.
    pub delivered: usize,
    /// Packets the receiver rejected, with the error.
    pub failed: Vec<(Hash, BridgeError)>,
}

/// Shared in-memory message network.
#[derive(Default)]
pub struct LayerZeroNetwork {
    endpoints: RwLock<HashMap<u32, Weak<SimulatedLayerZeroEndpoint>>>,
    queue: Mutex<VecDeque<LzPacket>>,
    delivered: Mutex<Vec<LzPacket>>,
}

impl LayerZeroNetwork {
    /// Empty network.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn attach(&self, endpoint: &Arc<SimulatedLayerZeroEndpoint>) {
        self.endpoints
            .write()
            .insert(endpoint.eid, Arc::downgrade(endpoint));
    }

    fn has_endpoint(&self, eid: u32) -> bool {
        self.endpoints.read().contains_key(&eid)
    }

    fn enqueue(&self, packet: LzPacket) {
        self.queue.lock().push_back(packet);
    }

    /// Packets waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Snapshot of the queue.
    pub fn pending_packets(&self) -> Vec<LzPacket> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Deliver the oldest queued packet.
    pub async fn deliver_next(&self) -> Option<Result<(), BridgeError>> {
        let packet = self.queue.lock().pop_front()?;
        Some(self.deliver(packet).await)
    }

    /// Deliver until the queue is empty, including packets sent during delivery.
    pub async fn deliver_all(&self) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        loop {
            let Some(packet) = self.queue.lock().pop_front() else {
                break;
            };
            let guid = packet.guid;
            match self.deliver(packet).await {
                Ok(()) => report.delivered += 1,
                Err(e) => report.failed.push((guid, e)),
            }
        }
        report
    }

    /// Deliver the packets queued right now, newest first.
    ///
    /// Packets sent during this delivery stay queued.
    pub async fn deliver_all_reversed(&self) -> DeliveryReport {
        let batch: Vec<LzPacket> = self.queue.lock().drain(..).collect();
        let mut report = DeliveryReport::default();
        for packet in batch.into_iter().rev() {
            let guid = packet.guid;
            match self.deliver(packet).await {
                Ok(()) => report.delivered += 1,
                Err(e) => report.failed.push((guid, e)),
            }
        }
        report
    }

    /// Deliver an already delivered packet again.
    pub async fn replay(&self, guid: &Hash) -> Result<(), BridgeError> {
        let packet = self
            .delivered
            .lock()
            .iter()
            .find(|p| p.guid == *guid)
            .cloned()
            .ok_or_else(|| {
                BridgeError::TransportError(format!("no delivered packet 0x{}", hex::encode(guid)))
            })?;
        self.deliver(packet).await
    }

    async fn deliver(&self, packet: LzPacket) -> Result<(), BridgeError> {
        let endpoint = self
            .endpoints
            .read()
            .get(&packet.dst_eid)
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                BridgeError::TransportError(format!("no endpoint for eid {}", packet.dst_eid))
            })?;

        let result = endpoint.receive(&packet).await;
        match &result {
            Ok(()) => {
                debug!(guid = %hex::encode(&packet.guid[..4]), "[lz] Packet delivered");
                self.delivered.lock().push(packet);
            }
            Err(e) => {
                warn!(guid = %hex::encode(&packet.guid[..4]), error = %e, "[lz] Packet rejected");
            }
        }
        result
    }
}

/// In-process endpoint.
pub struct SimulatedLayerZeroEndpoint {
    address: Address,
    eid: u32,
    fees: LzFeeSchedule,
    network: Arc<LayerZeroNetwork>,
    receivers: RwLock<HashMap<Address, Weak<dyn LzReceiver>>>,
    nonces: Mutex<HashMap<(Address, u32, Address), u64>>,
}

impl SimulatedLayerZeroEndpoint {
    /// Create an endpoint and attach it to `network`.
    pub fn new(
        address: Address,
        eid: u32,
        fees: LzFeeSchedule,
        network: &Arc<LayerZeroNetwork>,
    ) -> Arc<Self> {
        let endpoint = Arc::new(Self {
            address,
            eid,
            fees,
            network: Arc::clone(network),
            receivers: RwLock::new(HashMap::new()),
            nonces: Mutex::new(HashMap::new()),
        });
        network.attach(&endpoint);
        endpoint
    }

    /// Route packets addressed to `address` to `receiver`.
    pub fn register_receiver(&self, address: Address, receiver: Weak<dyn LzReceiver>) {
        self.receivers.write().insert(address, receiver);
    }

    fn fee_for(&self, message_len: usize, options: &[u8]) -> Result<U256, BridgeError> {
        let budget = summarize(&parse_options(options)?);
        let fees = &self.fees;
        Ok(fees
            .base_fee
            .saturating_add(fees.gas_price.saturating_mul(U256::from(budget.gas)))
            .saturating_add(fees.byte_price.saturating_mul(U256::from(message_len)))
            .saturating_add(fees.byte_price.saturating_mul(U256::from(budget.calldata_size)))
            .saturating_add(U256::from(budget.value)))
    }

    async fn receive(&self, packet: &LzPacket) -> Result<(), BridgeError> {
        let receiver = self
            .receivers
            .read()
            .get(&packet.receiver)
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                BridgeError::TransportError(format!(
                    "no receiver at {}",
                    address_hex(&packet.receiver)
                ))
            })?;
        receiver
            .lz_receive(self.address, packet.origin, packet.guid, packet.message.clone())
            .await
    }
}

fn packet_guid(nonce: u64, src_eid: u32, sender: &Address, dst_eid: u32, receiver: &Address) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(src_eid.to_be_bytes());
    hasher.update(sender);
    hasher.update(dst_eid.to_be_bytes());
    hasher.update(receiver);
    let mut guid = [0u8; 32];
    guid.copy_from_slice(&hasher.finalize());
    guid
}

#[async_trait]
impl LayerZeroEndpoint for SimulatedLayerZeroEndpoint {
    fn address(&self) -> Address {
        self.address
    }

    fn eid(&self) -> u32 {
        self.eid
    }

    async fn quote(&self, dst_eid: u32, message: &[u8], options: &[u8]) -> Result<U256, BridgeError> {
        if !self.network.has_endpoint(dst_eid) {
            return Err(BridgeError::TransportError(format!("unknown eid {dst_eid}")));
        }
        self.fee_for(message.len(), options)
    }

    async fn send(
        &self,
        sender: Address,
        dst_eid: u32,
        receiver: Address,
        message: Vec<u8>,
        options: Vec<u8>,
        value: U256,
    ) -> Result<MessagingReceipt, BridgeError> {
        let required = self.quote(dst_eid, &message, &options).await?;
        if value < required {
            return Err(BridgeError::InsufficientMsgValue {
                required,
                provided: value,
            });
        }

        let nonce = {
            let mut nonces = self.nonces.lock();
            let next = nonces.entry((sender, dst_eid, receiver)).or_insert(0);
            *next += 1;
            *next
        };
        let guid = packet_guid(nonce, self.eid, &sender, dst_eid, &receiver);

        self.network.enqueue(LzPacket {
            origin: Origin {
                src_eid: self.eid,
                sender,
                nonce,
            },
            dst_eid,
            receiver,
            guid,
            message,
        });

        Ok(MessagingReceipt {
            guid,
            nonce,
            native_fee: required,
        })
    }
}
