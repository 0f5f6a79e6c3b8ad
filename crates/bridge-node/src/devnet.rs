//! # In-Process Devnet
//!
//! One bridge router per configured chain, wired to shared simulated
//! LayerZero and CCIP networks. Every router registers the same three
//! adapters in the same order: LayerZero, Stargate, Chainlink CCIP.
//!
//! ```text
//!   chain A                     networks                     chain B
//! ┌──────────────┐         ┌──────────────────┐        ┌──────────────┐
//! │ BridgeRouter │──lz────→│ LayerZeroNetwork │──lz───→│ BridgeRouter │
//! │  + adapters  │──ccip──→│ CcipNetwork      │──ccip─→│  + adapters  │
//! └──────────────┘         └──────────────────┘        └──────────────┘
//! ```
//!
//! Packets queue until [`Devnet::relay`] delivers them.

use crate::config::NodeConfig;
use async_trait::async_trait;
use bridge_bus::InMemoryEventBus;
use bridge_router::adapters::chainlink::{CcipFeeSchedule, CcipReceiver};
use bridge_router::adapters::layerzero::{LzFeeSchedule, LzReceiver};
use bridge_router::adapters::{
    CcipNetwork, ChainlinkCcipAdapter, InMemoryAssetLedger, InMemoryOperationStore,
    LayerZeroAdapter, LayerZeroNetwork, ManualClock, SimulatedCcipRouter,
    SimulatedLayerZeroEndpoint, StargateAdapter, StaticAccessControl, StaticStateReader,
};
use bridge_router::{
    Address, BridgeAdapter, BridgeError, BridgeReceiver, BridgeRouter, BridgeRouterApi,
    CallContext, ChainId, ComposeAction, OperationId, OperationStore, RouterConfig, U256,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Devnet block time at genesis.
pub const GENESIS_TIME: u64 = 1_700_000_000;

const KIND_ROUTER: u8 = 0xB0;
const KIND_LZ: u8 = 0xA1;
const KIND_STARGATE: u8 = 0xA2;
const KIND_CCIP: u8 = 0xA3;
const KIND_LZ_ENDPOINT: u8 = 0xE1;
const KIND_CCIP_ROUTER: u8 = 0xE2;
const KIND_TOKEN: u8 = 0x70;

/// Deterministic devnet address for a component on chain `index`.
pub fn devnet_address(kind: u8, index: usize) -> Address {
    let mut address = [0u8; 20];
    address[0] = kind;
    address[12..20].copy_from_slice(&(index as u64 + 1).to_be_bytes());
    address
}

/// Receiver that records every callback. Fails all of them when `failing`.
#[derive(Default)]
pub struct RecordingReceiver {
    failing: bool,
    /// Read responses.
    pub reads: Mutex<Vec<(OperationId, Vec<u8>)>>,
    /// Messages: (id, source chain, originator, payload).
    pub messages: Mutex<Vec<(OperationId, ChainId, Address, Vec<u8>)>>,
    /// Compose bundles.
    pub composed: Mutex<Vec<(OperationId, Vec<ComposeAction>)>>,
    /// Asset arrivals.
    pub assets: Mutex<Vec<(OperationId, Address, U256)>>,
}

impl RecordingReceiver {
    /// Receiver that rejects every callback.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), BridgeError> {
        if self.failing {
            return Err(BridgeError::InvalidPayload("receiver reverted".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BridgeReceiver for RecordingReceiver {
    async fn on_read_response(&self, id: OperationId, data: &[u8]) -> Result<(), BridgeError> {
        self.check()?;
        self.reads.lock().push((id, data.to_vec()));
        Ok(())
    }

    async fn on_message_received(
        &self,
        id: OperationId,
        source_chain: ChainId,
        originator: &Address,
        payload: &[u8],
    ) -> Result<(), BridgeError> {
        self.check()?;
        self.messages
            .lock()
            .push((id, source_chain, *originator, payload.to_vec()));
        Ok(())
    }

    async fn on_compose(
        &self,
        id: OperationId,
        _source_chain: ChainId,
        actions: &[ComposeAction],
    ) -> Result<(), BridgeError> {
        self.check()?;
        self.composed.lock().push((id, actions.to_vec()));
        Ok(())
    }

    async fn on_asset_received(
        &self,
        id: OperationId,
        _source_chain: ChainId,
        asset: &Address,
        amount: U256,
    ) -> Result<(), BridgeError> {
        self.check()?;
        self.assets.lock().push((id, *asset, amount));
        Ok(())
    }
}

/// One chain of the devnet.
pub struct ChainNode {
    /// Protocol chain id.
    pub chain_id: ChainId,
    /// Display name.
    pub name: String,
    /// The chain's router.
    pub router: Arc<BridgeRouter>,
    /// Token balances.
    pub ledger: Arc<InMemoryAssetLedger>,
    /// Operation records.
    pub store: Arc<dyn OperationStore>,
    /// Block time.
    pub clock: Arc<ManualClock>,
    /// Contract state served to remote reads.
    pub state: Arc<StaticStateReader>,
    /// LayerZero adapter.
    pub lz: Arc<LayerZeroAdapter>,
    /// Stargate adapter.
    pub stargate: Arc<StargateAdapter>,
    /// CCIP adapter.
    pub ccip: Arc<ChainlinkCcipAdapter>,
    /// Devnet stablecoin on this chain.
    pub token: Address,
    endpoint: Arc<SimulatedLayerZeroEndpoint>,
    ccip_router: Arc<SimulatedCcipRouter>,
}

impl ChainNode {
    /// LayerZero endpoint.
    pub fn endpoint(&self) -> &Arc<SimulatedLayerZeroEndpoint> {
        &self.endpoint
    }

    /// CCIP router.
    pub fn ccip_router(&self) -> &Arc<SimulatedCcipRouter> {
        &self.ccip_router
    }
}

/// Totals from one [`Devnet::relay`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    /// Packets executed.
    pub delivered: usize,
    /// Packets whose execution failed.
    pub failed: usize,
}

/// The whole devnet.
pub struct Devnet {
    chains: Vec<ChainNode>,
    lz_network: Arc<LayerZeroNetwork>,
    ccip_network: Arc<CcipNetwork>,
    bus: Arc<InMemoryEventBus>,
    governor: Address,
    guardian: Address,
}

impl Devnet {
    /// Build and wire every configured chain.
    pub async fn start(config: &NodeConfig) -> Result<Self, BridgeError> {
        let governor = config
            .governor_address()
            .map_err(|e| BridgeError::InvalidParams(e.to_string()))?;
        let guardian = config
            .guardian_address()
            .map_err(|e| BridgeError::InvalidParams(e.to_string()))?;

        let lz_network = LayerZeroNetwork::new();
        let ccip_network = CcipNetwork::new();
        let bus = Arc::new(InMemoryEventBus::new());

        let mut chains = Vec::with_capacity(config.chains.len());
        for (index, chain) in config.chains.iter().enumerate() {
            let mut router_config =
                RouterConfig::new(chain.chain_id, devnet_address(KIND_ROUTER, index));
            router_config.max_adapters = config.max_adapters;

            let ledger = Arc::new(InMemoryAssetLedger::new());
            let store = open_store(config, chain.chain_id)?;
            let clock = Arc::new(ManualClock::new(GENESIS_TIME));
            let router = Arc::new(
                BridgeRouter::new(
                    router_config,
                    Arc::new(StaticAccessControl::new(governor, guardian)),
                    ledger.clone(),
                    store.clone(),
                    clock.clone(),
                )
                .with_events(bus.clone()),
            );
            let router_address = router.address();

            let endpoint = SimulatedLayerZeroEndpoint::new(
                devnet_address(KIND_LZ_ENDPOINT, index),
                chain.lz_eid,
                LzFeeSchedule::default(),
                &lz_network,
            );
            let ccip_router = SimulatedCcipRouter::new(
                devnet_address(KIND_CCIP_ROUTER, index),
                chain.ccip_selector,
                CcipFeeSchedule::default(),
                &ccip_network,
            );

            let state = Arc::new(StaticStateReader::new());
            let lz = Arc::new(
                LayerZeroAdapter::new(
                    devnet_address(KIND_LZ, index),
                    router_address,
                    endpoint.clone(),
                    ledger.clone(),
                    router.gateway(),
                )
                .with_state_reader(state.clone()),
            );
            let stargate = Arc::new(StargateAdapter::new(
                devnet_address(KIND_STARGATE, index),
                router_address,
                endpoint.clone(),
                ledger.clone(),
                router.gateway(),
            ));
            let ccip = Arc::new(ChainlinkCcipAdapter::new(
                devnet_address(KIND_CCIP, index),
                router_address,
                ccip_router.clone(),
                ledger.clone(),
                router.gateway(),
            ));

            let lz_recv: Weak<dyn LzReceiver> = Arc::downgrade(&lz) as Weak<LayerZeroAdapter>;
            let sg_recv: Weak<dyn LzReceiver> = Arc::downgrade(&stargate) as Weak<StargateAdapter>;
            let ccip_recv: Weak<dyn CcipReceiver> =
                Arc::downgrade(&ccip) as Weak<ChainlinkCcipAdapter>;
            endpoint.register_receiver(lz.address(), lz_recv);
            endpoint.register_receiver(stargate.address(), sg_recv);
            ccip_router.register_receiver(ccip.address(), ccip_recv);

            let ctx = CallContext::new(governor);
            router.register_adapter(&ctx, lz.clone()).await?;
            router.register_adapter(&ctx, stargate.clone()).await?;
            router.register_adapter(&ctx, ccip.clone()).await?;

            let token = devnet_address(KIND_TOKEN, index);
            let liquidity = U256::from(config.adapter_liquidity);
            for adapter in [lz.address(), stargate.address(), ccip.address()] {
                ledger.mint(token, adapter, liquidity);
            }

            info!(chain_id = chain.chain_id, name = %chain.name, "[devnet] Chain started");
            chains.push(ChainNode {
                chain_id: chain.chain_id,
                name: chain.name.clone(),
                router,
                ledger,
                store,
                clock,
                state,
                lz,
                stargate,
                ccip,
                token,
                endpoint,
                ccip_router,
            });
        }

        for local in &chains {
            for (remote_index, remote) in chains.iter().enumerate() {
                if remote.chain_id == local.chain_id {
                    continue;
                }
                let remote_cfg = &config.chains[remote_index];
                local
                    .lz
                    .set_peer(remote.chain_id, remote_cfg.lz_eid, remote.lz.address());
                local.lz.map_asset(remote.chain_id, local.token, remote.token);
                local
                    .stargate
                    .set_peer(remote.chain_id, remote_cfg.lz_eid, remote.stargate.address());
                local.stargate.add_pool(
                    remote.chain_id,
                    local.token,
                    remote.token,
                    config.stargate_fee_bps,
                );
                local
                    .ccip
                    .set_lane(remote.chain_id, remote_cfg.ccip_selector, remote.ccip.address());
                local.ccip.map_token(remote.chain_id, local.token, remote.token);
            }
        }

        Ok(Self {
            chains,
            lz_network,
            ccip_network,
            bus,
            governor,
            guardian,
        })
    }

    /// All chains in config order.
    pub fn chains(&self) -> &[ChainNode] {
        &self.chains
    }

    /// Chain by id.
    pub fn chain(&self, chain_id: ChainId) -> Result<&ChainNode, BridgeError> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .ok_or(BridgeError::UnsupportedChain(chain_id))
    }

    /// Shared event bus.
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Governor of every router.
    pub fn governor(&self) -> Address {
        self.governor
    }

    /// Guardian of every router.
    pub fn guardian(&self) -> Address {
        self.guardian
    }

    /// LayerZero network.
    pub fn lz_network(&self) -> &Arc<LayerZeroNetwork> {
        &self.lz_network
    }

    /// CCIP network.
    pub fn ccip_network(&self) -> &Arc<CcipNetwork> {
        &self.ccip_network
    }

    /// Packets waiting on either network.
    pub fn pending(&self) -> usize {
        self.lz_network.pending() + self.ccip_network.pending()
    }

    /// Deliver queued packets on both networks until nothing is left.
    pub async fn relay(&self) -> RelayReport {
        let mut report = RelayReport::default();
        while self.pending() > 0 {
            let lz = self.lz_network.deliver_all().await;
            report.delivered += lz.delivered;
            report.failed += lz.failed.len();

            let (executed, failed) = self.ccip_network.deliver_all().await;
            report.delivered += executed;
            report.failed += failed;
        }
        debug!(delivered = report.delivered, failed = report.failed, "[devnet] Relay finished");
        report
    }

    /// Advance every chain's clock.
    pub fn advance_time(&self, secs: u64) {
        for chain in &self.chains {
            chain.clock.advance(secs);
        }
    }
}

#[cfg(feature = "rocksdb")]
fn open_store(config: &NodeConfig, chain_id: ChainId) -> Result<Arc<dyn OperationStore>, BridgeError> {
    use bridge_router::adapters::RocksDbOperationStore;

    match &config.data_dir {
        Some(dir) => {
            let path = dir.join(format!("chain-{chain_id}"));
            info!(chain_id, path = %path.display(), "[devnet] Opening persistent store");
            Ok(Arc::new(RocksDbOperationStore::open(path)?))
        }
        None => Ok(Arc::new(InMemoryOperationStore::new())),
    }
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(config: &NodeConfig, chain_id: ChainId) -> Result<Arc<dyn OperationStore>, BridgeError> {
    if config.data_dir.is_some() {
        tracing::warn!(chain_id, "[devnet] data_dir ignored without the rocksdb feature");
    }
    Ok(Arc::new(InMemoryOperationStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_router::{BridgeOptions, MessageRequest, OperationStatus};

    #[tokio::test]
    async fn test_devnet_wiring() {
        let devnet = Devnet::start(&NodeConfig::default()).await.unwrap();
        assert_eq!(devnet.chains().len(), 3);

        let eth = devnet.chain(1).unwrap();
        assert_eq!(eth.router.get_adapters().len(), 3);
        assert!(eth.lz.supports_chain(42161));
        assert!(eth.ccip.supports_chain(10));
        assert!(!eth.lz.supports_chain(1));
        assert!(matches!(devnet.chain(999), Err(BridgeError::UnsupportedChain(999))));
    }

    #[tokio::test]
    async fn test_message_relayed() {
        let devnet = Devnet::start(&NodeConfig::default()).await.unwrap();
        let eth = devnet.chain(1).unwrap();
        let arb = devnet.chain(42161).unwrap();
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver([0x0D; 20], inbox.clone());

        let id = eth
            .router
            .send_message(
                &CallContext::with_value([0x0C; 20], U256::from(10_000_000u64)),
                MessageRequest {
                    dest_chain: 42161,
                    recipient: [0x0D; 20],
                    payload: b"gm".to_vec(),
                    originator: [0x0C; 20],
                },
                &BridgeOptions::default(),
            )
            .await
            .unwrap();

        let report = devnet.relay().await;
        assert_eq!(report.failed, 0);
        assert_eq!(devnet.pending(), 0);
        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(inbox.messages.lock()[0].3, b"gm".to_vec());
    }

    #[test]
    fn test_devnet_addresses_distinct() {
        assert_ne!(devnet_address(KIND_LZ, 0), devnet_address(KIND_LZ, 1));
        assert_ne!(devnet_address(KIND_LZ, 0), devnet_address(KIND_CCIP, 0));
    }
}
