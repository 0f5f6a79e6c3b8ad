//! # Domain Invariants
//!
//! Request validation and lifecycle rules. Every check here runs before any
//! state is touched.

use super::entities::{
    AdapterParams, ComposeRequest, MessageRequest, ReadRequest, TransferRequest,
};
use super::errors::BridgeError;
use bridge_types::{is_zero_address, ChainId, OperationStatus};

/// Default registry capacity.
pub const DEFAULT_MAX_ADAPTERS: usize = 16;

/// Largest payload or call data size a quote may be sized for.
pub const MAX_CALLDATA_SIZE: u32 = 64 * 1024;

/// Invariant: transfers move a non-zero amount of a real asset to a real
/// recipient on another chain.
pub fn invariant_valid_transfer(
    local_chain: ChainId,
    req: &TransferRequest,
) -> Result<(), BridgeError> {
    if req.amount.is_zero() {
        return Err(BridgeError::InvalidParams("amount is zero".into()));
    }
    if is_zero_address(&req.recipient) {
        return Err(BridgeError::InvalidParams("recipient is zero".into()));
    }
    if is_zero_address(&req.asset) {
        return Err(BridgeError::InvalidParams("asset is zero".into()));
    }
    if req.dest_chain == local_chain {
        return Err(BridgeError::InvalidParams(
            "destination is the local chain".into(),
        ));
    }
    Ok(())
}

/// Invariant: reads name a target and an originator to answer.
pub fn invariant_valid_read(req: &ReadRequest) -> Result<(), BridgeError> {
    if is_zero_address(&req.target) {
        return Err(BridgeError::InvalidParams("target is zero".into()));
    }
    if is_zero_address(&req.originator) {
        return Err(BridgeError::InvalidParams("originator is zero".into()));
    }
    Ok(())
}

/// Invariant: messages carry a payload between two real accounts.
pub fn invariant_valid_message(req: &MessageRequest) -> Result<(), BridgeError> {
    if is_zero_address(&req.recipient) {
        return Err(BridgeError::InvalidParams("recipient is zero".into()));
    }
    if is_zero_address(&req.originator) {
        return Err(BridgeError::InvalidParams("originator is zero".into()));
    }
    if req.payload.is_empty() {
        return Err(BridgeError::InvalidParams("payload is empty".into()));
    }
    Ok(())
}

/// Invariant: compose bundles are non-empty and every action has a target.
pub fn invariant_valid_compose(req: &ComposeRequest) -> Result<(), BridgeError> {
    if req.actions.is_empty() {
        return Err(BridgeError::InvalidParams("no actions".into()));
    }
    if let Some(index) = req.actions.iter().position(|a| is_zero_address(&a.target)) {
        return Err(BridgeError::InvalidParams(format!(
            "action {index} has a zero target"
        )));
    }
    Ok(())
}

/// Invariant: transport hints stay within quotable bounds.
pub fn invariant_valid_params(params: &AdapterParams) -> Result<(), BridgeError> {
    if params.calldata_size > MAX_CALLDATA_SIZE {
        return Err(BridgeError::InvalidParams(format!(
            "calldata size {} exceeds {}",
            params.calldata_size, MAX_CALLDATA_SIZE
        )));
    }
    Ok(())
}

/// Invariant: status only moves forward.
pub fn invariant_forward_transition(
    from: OperationStatus,
    to: OperationStatus,
) -> Result<(), BridgeError> {
    if !from.can_transition_to(to) {
        return Err(BridgeError::InvalidStatusTransition { from, to });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ComposeAction;
    use bridge_types::{ZERO_ADDRESS, U256};

    fn transfer(amount: u64) -> TransferRequest {
        TransferRequest {
            dest_chain: 10,
            asset: [1u8; 20],
            amount: U256::from(amount),
            recipient: [2u8; 20],
        }
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(matches!(
            invariant_valid_transfer(1, &transfer(0)),
            Err(BridgeError::InvalidParams(_))
        ));
        assert!(invariant_valid_transfer(1, &transfer(5)).is_ok());
    }

    #[test]
    fn test_transfer_to_local_chain_rejected() {
        assert!(invariant_valid_transfer(10, &transfer(5)).is_err());
    }

    #[test]
    fn test_zero_recipient_and_asset_rejected() {
        let mut req = transfer(5);
        req.recipient = ZERO_ADDRESS;
        assert!(invariant_valid_transfer(1, &req).is_err());

        let mut req = transfer(5);
        req.asset = ZERO_ADDRESS;
        assert!(invariant_valid_transfer(1, &req).is_err());
    }

    #[test]
    fn test_empty_message_rejected() {
        let req = MessageRequest {
            dest_chain: 10,
            recipient: [2u8; 20],
            payload: Vec::new(),
            originator: [3u8; 20],
        };
        assert!(invariant_valid_message(&req).is_err());
    }

    #[test]
    fn test_read_requires_originator() {
        let req = ReadRequest {
            dest_chain: 10,
            target: [2u8; 20],
            selector: [0xde, 0xad, 0xbe, 0xef],
            call_data: Vec::new(),
            originator: ZERO_ADDRESS,
        };
        assert!(invariant_valid_read(&req).is_err());
    }

    #[test]
    fn test_compose_rules() {
        let empty = ComposeRequest {
            dest_chain: 10,
            actions: Vec::new(),
        };
        assert!(invariant_valid_compose(&empty).is_err());

        let zero_target = ComposeRequest {
            dest_chain: 10,
            actions: vec![
                ComposeAction {
                    target: [5u8; 20],
                    payload: vec![1],
                },
                ComposeAction {
                    target: ZERO_ADDRESS,
                    payload: vec![2],
                },
            ],
        };
        let err = invariant_valid_compose(&zero_target).unwrap_err();
        assert!(err.to_string().contains("action 1"));
    }

    #[test]
    fn test_calldata_size_capped() {
        let mut params = AdapterParams {
            calldata_size: MAX_CALLDATA_SIZE,
            ..AdapterParams::default()
        };
        assert!(invariant_valid_params(&params).is_ok());

        params.calldata_size = u32::MAX;
        assert!(matches!(
            invariant_valid_params(&params),
            Err(BridgeError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_forward_transition() {
        assert!(invariant_forward_transition(OperationStatus::Pending, OperationStatus::Delivered).is_ok());
        assert!(matches!(
            invariant_forward_transition(OperationStatus::Completed, OperationStatus::Failed),
            Err(BridgeError::InvalidStatusTransition { .. })
        ));
        assert!(invariant_forward_transition(OperationStatus::Pending, OperationStatus::Pending).is_err());
    }
}
