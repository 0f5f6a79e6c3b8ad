//! # Adapter Selection
//!
//! Linear scan over the registry in registration order. Adapters that cannot
//! serve the route are skipped, the rest are asked for a quote, and the
//! strictly cheapest native fee wins. Ties keep the earliest registered.

use crate::domain::{AdapterParams, Address, BridgeError, ChainId, FeeEstimate, OperationType, U256};
use crate::ports::outbound::BridgeAdapter;
use std::sync::Arc;
use tracing::debug;

/// Winning adapter with its quote.
pub struct Selection {
    /// Selected adapter.
    pub adapter: Arc<dyn BridgeAdapter>,
    /// Its fee estimate.
    pub estimate: FeeEstimate,
}

/// Static capability filter applied before quoting.
pub fn is_candidate(
    adapter: &dyn BridgeAdapter,
    dest_chain: ChainId,
    asset: &Address,
    operation: OperationType,
) -> bool {
    if !adapter.supports_chain(dest_chain) || !adapter.supports_operation(operation) {
        return false;
    }
    operation != OperationType::TransferAsset || adapter.supports_asset(dest_chain, asset)
}

/// Pick the cheapest adapter among `adapters`.
///
/// Capability errors from `estimate_fee` skip the candidate; any other error
/// aborts the selection.
pub async fn select_best_adapter(
    adapters: &[Arc<dyn BridgeAdapter>],
    dest_chain: ChainId,
    asset: &Address,
    amount: U256,
    params: &AdapterParams,
    operation: OperationType,
) -> Result<Selection, BridgeError> {
    let mut best: Option<Selection> = None;

    for adapter in adapters {
        if !is_candidate(adapter.as_ref(), dest_chain, asset, operation) {
            continue;
        }

        let estimate = match adapter
            .estimate_fee(dest_chain, asset, amount, params, operation)
            .await
        {
            Ok(estimate) => estimate,
            Err(e) if e.is_capability_mismatch() => {
                debug!(adapter = adapter.name(), error = %e, "[router] Candidate skipped");
                continue;
            }
            Err(e) => return Err(e),
        };

        let cheaper = best
            .as_ref()
            .map_or(true, |b| estimate.native_fee < b.estimate.native_fee);
        if cheaper {
            best = Some(Selection {
                adapter: Arc::clone(adapter),
                estimate,
            });
        }
    }

    best.ok_or(BridgeError::NoSuitableAdapter { dest_chain })
}
