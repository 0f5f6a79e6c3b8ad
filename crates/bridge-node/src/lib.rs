//! # Bridge Node
//!
//! Configuration loading and an in-process multi-chain devnet for the
//! bridge router.
//!
//! ## Modules
//!
//! - `config/` - `NodeConfig`: defaults, JSON file, `BRIDGE_*` overrides
//! - `devnet/` - one router per chain over simulated LayerZero and CCIP

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod devnet;

pub use config::{ChainConfig, ConfigError, NodeConfig};
pub use devnet::{devnet_address, ChainNode, Devnet, RecordingReceiver, RelayReport};
