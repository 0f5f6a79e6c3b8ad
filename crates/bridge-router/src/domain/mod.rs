//! # Domain Module
//!
//! Core domain types for the bridge router.

pub mod entities;
pub mod errors;
pub mod invariants;

pub use entities::*;
pub use errors::*;
pub use invariants::*;

pub use bridge_types::{
    address_hex, is_zero_address, Address, ChainId, Hash, OperationId, OperationStatus,
    OperationType, U256, ZERO_ADDRESS,
};
