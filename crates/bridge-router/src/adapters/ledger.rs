//! In-memory `AssetLedger`.
//!
//! One ledger per chain. Bridge escrow and liquidity are ordinary accounts:
//! adapter addresses hold locked transfers on the source side and release
//! liquidity on the destination side.

use crate::domain::{Address, BridgeError, U256};
use crate::ports::outbound::AssetLedger;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Balance table keyed by (asset, holder).
#[derive(Default)]
pub struct InMemoryAssetLedger {
    balances: RwLock<HashMap<(Address, Address), U256>>,
}

impl InMemoryAssetLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` out of thin air.
    pub fn mint(&self, asset: Address, to: Address, amount: U256) {
        let mut balances = self.balances.write();
        let entry = balances.entry((asset, to)).or_default();
        *entry = entry.saturating_add(amount);
    }
}

impl AssetLedger for InMemoryAssetLedger {
    fn transfer(
        &self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), BridgeError> {
        let mut balances = self.balances.write();

        let available = balances.get(&(*asset, *from)).copied().unwrap_or_default();
        if available < amount {
            return Err(BridgeError::InsufficientBalance {
                asset: *asset,
                holder: *from,
                required: amount,
                available,
            });
        }

        balances.insert((*asset, *from), available - amount);
        let entry = balances.entry((*asset, *to)).or_default();
        *entry = entry.saturating_add(amount);

        trace!(amount = %amount, "[ledger] Transfer applied");
        Ok(())
    }

    fn balance_of(&self, asset: &Address, holder: &Address) -> U256 {
        self.balances
            .read()
            .get(&(*asset, *holder))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = [0xAA; 20];

    #[test]
    fn test_transfer_moves_balance() {
        let ledger = InMemoryAssetLedger::new();
        ledger.mint(TOKEN, [1u8; 20], U256::from(100u64));

        ledger
            .transfer(&TOKEN, &[1u8; 20], &[2u8; 20], U256::from(40u64))
            .unwrap();

        assert_eq!(ledger.balance_of(&TOKEN, &[1u8; 20]), U256::from(60u64));
        assert_eq!(ledger.balance_of(&TOKEN, &[2u8; 20]), U256::from(40u64));
    }

    #[test]
    fn test_overdraft_rejected_without_change() {
        let ledger = InMemoryAssetLedger::new();
        ledger.mint(TOKEN, [1u8; 20], U256::from(10u64));

        let err = ledger
            .transfer(&TOKEN, &[1u8; 20], &[2u8; 20], U256::from(11u64))
            .unwrap_err();

        assert!(matches!(err, BridgeError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&TOKEN, &[1u8; 20]), U256::from(10u64));
        assert_eq!(ledger.balance_of(&TOKEN, &[2u8; 20]), U256::zero());
    }
}
