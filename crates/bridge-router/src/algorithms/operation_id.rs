//! # Operation Id Derivation
//!
//! `keccak256(source_chain || dest_chain || operation_type || asset || amount
//! || recipient || originator || timestamp || nonce)`, integers big-endian.
//!
//! The nonce is the router's dispatch sequence, so identical requests in the
//! same second still get distinct ids.

use crate::domain::{OperationDraft, OperationId};
use bridge_types::u256_to_be_bytes;
use sha3::{Digest, Keccak256};

/// Derive the id of a dispatch.
pub fn derive_operation_id(draft: &OperationDraft, timestamp: u64, nonce: u64) -> OperationId {
    let mut hasher = Keccak256::new();
    hasher.update(draft.source_chain.to_be_bytes());
    hasher.update(draft.dest_chain.to_be_bytes());
    hasher.update([draft.operation_type.as_u8()]);
    hasher.update(draft.asset);
    hasher.update(u256_to_be_bytes(draft.amount));
    hasher.update(draft.recipient);
    hasher.update(draft.originator);
    hasher.update(timestamp.to_be_bytes());
    hasher.update(nonce.to_be_bytes());

    let mut id = [0u8; 32];
    id.copy_from_slice(&hasher.finalize());
    OperationId(id)
}
