//! In-memory `OperationStore`.

use crate::domain::{BridgeError, Operation, OperationId};
use crate::ports::outbound::OperationStore;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct StoreState {
    operations: HashMap<OperationId, Operation>,
    inbound: HashSet<OperationId>,
    next_nonce: u64,
    paused: bool,
}

/// Operation store held in a single lock, so a dispatch commit is atomic.
#[derive(Default)]
pub struct InMemoryOperationStore {
    state: RwLock<StoreState>,
}

impl InMemoryOperationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored operations.
    pub fn len(&self) -> usize {
        self.state.read().operations.len()
    }

    /// Whether no operation has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OperationStore for InMemoryOperationStore {
    fn get_operation(&self, id: &OperationId) -> Result<Option<Operation>, BridgeError> {
        Ok(self.state.read().operations.get(id).cloned())
    }

    fn put_operation(&self, operation: &Operation) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        match state.operations.get_mut(&operation.id) {
            Some(existing) => {
                *existing = operation.clone();
                Ok(())
            }
            None => Err(BridgeError::UnknownOperation(operation.id)),
        }
    }

    fn commit_dispatch(&self, operation: &Operation, next_nonce: u64) -> Result<(), BridgeError> {
        let mut state = self.state.write();
        if state.operations.contains_key(&operation.id) {
            return Err(BridgeError::OperationIdCollision(operation.id));
        }
        state.operations.insert(operation.id, operation.clone());
        state.next_nonce = next_nonce;
        Ok(())
    }

    fn next_nonce(&self) -> Result<u64, BridgeError> {
        Ok(self.state.read().next_nonce)
    }

    fn is_paused(&self) -> Result<bool, BridgeError> {
        Ok(self.state.read().paused)
    }

    fn set_paused(&self, paused: bool) -> Result<(), BridgeError> {
        self.state.write().paused = paused;
        Ok(())
    }

    fn mark_inbound(&self, id: &OperationId) -> Result<bool, BridgeError> {
        Ok(self.state.write().inbound.insert(*id))
    }
}
