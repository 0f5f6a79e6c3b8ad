//! # Adapters Layer (Hexagonal Architecture)
//!
//! Transport bindings (LayerZero, Stargate, Chainlink CCIP), the wire codec
//! and delivery handling they share, and the infrastructure implementations
//! of the outbound ports.

mod access_control;
mod clock;
mod ledger;
#[cfg(feature = "rocksdb")]
mod rocksdb_store;
mod state_reader;
mod store;

pub mod chainlink;
pub mod codec;
pub mod delivery;
pub mod escrow;
pub mod layerzero;
pub mod stargate;

pub use access_control::StaticAccessControl;
pub use chainlink::{CcipNetwork, ChainlinkCcipAdapter, SimulatedCcipRouter};
pub use clock::{ManualClock, SystemClock};
pub use delivery::{DeliveryHandler, ReplyChannel};
pub use escrow::AdapterEscrow;
pub use layerzero::{LayerZeroAdapter, LayerZeroNetwork, SimulatedLayerZeroEndpoint};
pub use ledger::InMemoryAssetLedger;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::RocksDbOperationStore;
pub use stargate::StargateAdapter;
pub use state_reader::StaticStateReader;
pub use store::InMemoryOperationStore;
