//! Source-side custody for outbound transfers.
//!
//! The router pulls the sender's funds into its own account, then the
//! adapter pulls them from the router into the adapter account before the
//! packet leaves. A dispatch that fails after the lock hands the funds back
//! to the router, which in turn reverses its own pull.

use crate::domain::{Address, BridgeError, DispatchReceipt, U256};
use crate::ports::outbound::AssetLedger;
use std::sync::Arc;
use tracing::{debug, error};

/// Adapter account on one chain's ledger.
pub struct AdapterEscrow {
    holder: Address,
    router: Address,
    component: &'static str,
    ledger: Arc<dyn AssetLedger>,
}

impl AdapterEscrow {
    /// Escrow held at `holder`, funded by the router at `router`.
    pub fn new(
        holder: Address,
        router: Address,
        component: &'static str,
        ledger: Arc<dyn AssetLedger>,
    ) -> Self {
        Self {
            holder,
            router,
            component,
            ledger,
        }
    }

    /// Pull `amount` of `asset` from the router into the adapter account.
    pub fn lock(&self, asset: &Address, amount: U256) -> Result<(), BridgeError> {
        self.ledger
            .transfer(asset, &self.router, &self.holder, amount)?;
        debug!(amount = %amount, "[{}] Transfer locked", self.component);
        Ok(())
    }

    /// Return a lock to the router when `result` is an error.
    pub fn settle(
        &self,
        asset: &Address,
        amount: U256,
        result: Result<DispatchReceipt, BridgeError>,
    ) -> Result<DispatchReceipt, BridgeError> {
        if result.is_err() {
            if let Err(e) = self
                .ledger
                .transfer(asset, &self.holder, &self.router, amount)
            {
                error!(error = %e, "[{}] Failed to return locked funds", self.component);
            }
        }
        result
    }

    /// Balance currently locked for `asset`.
    pub fn locked(&self, asset: &Address) -> U256 {
        self.ledger.balance_of(asset, &self.holder)
    }
}
