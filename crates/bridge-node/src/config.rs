//! # Node Configuration
//!
//! Devnet and router configuration with sane defaults, an optional JSON file
//! and environment overrides.
//!
//! ## Sources (later wins)
//!
//! 1. `NodeConfig::default()`
//! 2. JSON file named by `BRIDGE_CONFIG`
//! 3. `BRIDGE_LOG`, `BRIDGE_MAX_ADAPTERS`, `BRIDGE_DATA_DIR`

use bridge_types::{is_zero_address, Address, ChainId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Path to a JSON config file.
pub const ENV_CONFIG: &str = "BRIDGE_CONFIG";
/// Log filter override.
pub const ENV_LOG: &str = "BRIDGE_LOG";
/// Registry capacity override.
pub const ENV_MAX_ADAPTERS: &str = "BRIDGE_MAX_ADAPTERS";
/// Data directory override.
pub const ENV_DATA_DIR: &str = "BRIDGE_DATA_DIR";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `NodeConfig`.
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Environment variable has an unusable value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// No chains configured.
    #[error("at least one chain must be configured")]
    NoChains,

    /// Chain id listed twice.
    #[error("duplicate chain id {0}")]
    DuplicateChain(ChainId),

    /// LayerZero eid or CCIP selector listed twice.
    #[error("duplicate transport id {0}")]
    DuplicateTransportId(u64),

    /// Address is not 20 bytes of hex.
    #[error("{field}: invalid address {value:?}")]
    InvalidAddress {
        /// Config field.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// Address is zero.
    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    /// Numeric setting out of range.
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Config field.
        field: &'static str,
        /// Offending value.
        value: u64,
    },
}

/// One devnet chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Protocol chain id.
    pub chain_id: ChainId,
    /// Display name.
    pub name: String,
    /// LayerZero endpoint id.
    pub lz_eid: u32,
    /// CCIP chain selector.
    pub ccip_selector: u64,
}

impl ChainConfig {
    fn new(chain_id: ChainId, name: &str, lz_eid: u32, ccip_selector: u64) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            lz_eid,
            ccip_selector,
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Registry capacity per router.
    pub max_adapters: usize,
    /// Directory for persistent operation stores (`rocksdb` feature).
    pub data_dir: Option<PathBuf>,
    /// Governor account, hex.
    pub governor: String,
    /// Guardian account, hex.
    pub guardian: String,
    /// Stargate pool fee in basis points.
    pub stargate_fee_bps: u32,
    /// Destination liquidity minted to every adapter escrow.
    pub adapter_liquidity: u64,
    /// Chains in the devnet.
    pub chains: Vec<ChainConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            max_adapters: bridge_router::DEFAULT_MAX_ADAPTERS,
            data_dir: None,
            governor: "0x00000000000000000000000000000000000000a0".to_string(),
            guardian: "0x00000000000000000000000000000000000000a1".to_string(),
            stargate_fee_bps: 6,
            adapter_liquidity: 1_000_000_000_000,
            chains: vec![
                ChainConfig::new(1, "ethereum", 30101, 5_009_297_550_715_157_269),
                ChainConfig::new(42161, "arbitrum", 30110, 4_949_039_107_694_359_620),
                ChainConfig::new(10, "optimism", 30111, 3_734_403_246_176_062_136),
            ],
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` for environment variables.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(value) = lookup(ENV_MAX_ADAPTERS) {
            self.max_adapters = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MAX_ADAPTERS,
                value,
            })?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Reject configurations the devnet cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        let mut chain_ids = HashSet::new();
        let mut eids = HashSet::new();
        let mut selectors = HashSet::new();
        for chain in &self.chains {
            if !chain_ids.insert(chain.chain_id) {
                return Err(ConfigError::DuplicateChain(chain.chain_id));
            }
            if !eids.insert(chain.lz_eid) {
                return Err(ConfigError::DuplicateTransportId(u64::from(chain.lz_eid)));
            }
            if !selectors.insert(chain.ccip_selector) {
                return Err(ConfigError::DuplicateTransportId(chain.ccip_selector));
            }
        }

        self.governor_address()?;
        self.guardian_address()?;

        if self.max_adapters == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_adapters",
                value: 0,
            });
        }
        if self.stargate_fee_bps > 10_000 {
            return Err(ConfigError::OutOfRange {
                field: "stargate_fee_bps",
                value: u64::from(self.stargate_fee_bps),
            });
        }
        Ok(())
    }

    /// Governor account.
    pub fn governor_address(&self) -> Result<Address, ConfigError> {
        parse_account("governor", &self.governor)
    }

    /// Guardian account.
    pub fn guardian_address(&self) -> Result<Address, ConfigError> {
        parse_account("guardian", &self.guardian)
    }
}

/// Parse a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    let invalid = || ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    };
    let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|_| invalid())?;
    if bytes.len() != 20 {
        return Err(invalid());
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);
    Ok(address)
}

fn parse_account(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    let address = parse_address(field, value)?;
    if is_zero_address(&address) {
        return Err(ConfigError::ZeroAddress(field));
    }
    Ok(address)
}
