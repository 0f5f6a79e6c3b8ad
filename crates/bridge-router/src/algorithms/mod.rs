//! # Algorithms Module
//!
//! Id derivation and adapter selection.

pub mod operation_id;
pub mod selection;

pub use operation_id::derive_operation_id;
pub use selection::{is_candidate, select_best_adapter, Selection};
