//! # Operation Lifecycle Types
//!
//! Identifier, kind and status of a cross-chain operation.

use crate::entities::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-derived identifier of a cross-chain operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub Hash);

impl OperationId {
    /// Raw bytes of the identifier.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// First four bytes as hex, for compact log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<Hash> for OperationId {
    fn from(hash: Hash) -> Self {
        Self(hash)
    }
}

/// Kind of cross-chain work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Move an asset to a recipient on another chain.
    TransferAsset,
    /// Deliver an opaque payload to a recipient on another chain.
    Message,
    /// Read remote state and return the result to an originator.
    StateRead,
    /// Execute a bundle of actions atomically on another chain.
    Compose,
}

impl OperationType {
    /// Stable one-byte discriminant used in id derivation.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::TransferAsset => 0,
            Self::Message => 1,
            Self::StateRead => 2,
            Self::Compose => 3,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransferAsset => "TRANSFER_ASSET",
            Self::Message => "MESSAGE",
            Self::StateRead => "STATE_READ",
            Self::Compose => "COMPOSE",
        };
        f.write_str(name)
    }
}

/// Operation status state machine.
///
/// ```text
/// Pending ──→ Delivered ──→ Completed
///    │            │
///    ├────────────┼───────→ Failed
///    └──────────────────────→ Completed
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Dispatched, awaiting transport delivery.
    #[default]
    Pending,
    /// Arrived at the destination, not yet executed.
    Delivered,
    /// Executed successfully (terminal).
    Completed,
    /// Execution failed on the destination (terminal).
    Failed,
}

impl OperationStatus {
    /// Check if transition is valid.
    #[must_use]
    pub fn can_transition_to(&self, next: OperationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Delivered)
                | (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Delivered, Self::Completed)
                | (Self::Delivered, Self::Failed)
        )
    }

    /// Check if terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}
