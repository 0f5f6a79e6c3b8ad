//! # Bridge Types Crate
//!
//! Primitive types shared by every bridge crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Addresses, chain ids, amounts and the operation
//!   lifecycle are defined here and nowhere else.
//! - **Protocol-level chain ids**: `ChainId` is the router's own namespace. Each
//!   transport keeps its own translation table (LayerZero eids, CCIP selectors).
//! - **Forward-only lifecycle**: `OperationStatus::can_transition_to` is the only
//!   definition of legal status moves.

pub mod entities;
pub mod operation;

pub use entities::*;
pub use operation::*;
