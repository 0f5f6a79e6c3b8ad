//! `StateReader` over a fixed table of canned call results.

use crate::domain::{address_hex, Address, BridgeError};
use crate::ports::outbound::StateReader;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Answers `(target, selector)` calls from a table; call data is ignored.
#[derive(Default)]
pub struct StaticStateReader {
    values: RwLock<HashMap<(Address, [u8; 4]), Vec<u8>>>,
}

impl StaticStateReader {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result of a call.
    pub fn set(&self, target: Address, selector: [u8; 4], value: Vec<u8>) {
        self.values.write().insert((target, selector), value);
    }
}

#[async_trait]
impl StateReader for StaticStateReader {
    async fn read(
        &self,
        target: &Address,
        selector: [u8; 4],
        _call_data: &[u8],
    ) -> Result<Vec<u8>, BridgeError> {
        self.values
            .read()
            .get(&(*target, selector))
            .cloned()
            .ok_or_else(|| {
                BridgeError::InvalidParams(format!(
                    "no state at {} for selector 0x{}",
                    address_hex(target),
                    hex::encode(selector)
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_known_and_unknown() {
        let reader = StaticStateReader::new();
        reader.set([1u8; 20], [0, 0, 0, 1], vec![42]);

        assert_eq!(reader.read(&[1u8; 20], [0, 0, 0, 1], &[]).await.unwrap(), vec![42]);
        assert!(reader.read(&[1u8; 20], [0, 0, 0, 2], &[]).await.is_err());
    }
}
