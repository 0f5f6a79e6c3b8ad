//! # Transport Behavior
//!
//! Adapter-specific behavior observed end to end: Stargate pool fees,
//! CCIP lanes, cheapest-adapter selection, and packets that arrive out of
//! order or more than once.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bridge_bus::{EventFilter, EventSubscriber, EventTopic};
    use bridge_node::RecordingReceiver;
    use bridge_router::{
        AssetLedger, BridgeAdapter, BridgeError, BridgeRouterApi, CallContext, OperationStatus,
        OperationStore, OperationType, ReadRequest, U256, ZERO_ADDRESS,
    };

    use crate::fixtures::*;

    // =============================================================================
    // STARGATE
    // =============================================================================

    #[tokio::test]
    async fn test_stargate_deducts_pool_fee() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        eth.ledger.mint(eth.token, ALICE, U256::from(1_000_000u64));
        let pool = eth.ledger.balance_of(&eth.token, &eth.stargate.address());

        let quote = eth
            .router
            .quote(
                ARBITRUM,
                &eth.token,
                U256::from(1_000_000u64),
                &options(Some(eth.stargate.address()), 0),
                OperationType::TransferAsset,
            )
            .await
            .unwrap();
        assert_eq!(quote.token_fee, U256::from(600u64));
        assert_eq!(quote.selected_adapter, eth.stargate.address());

        let id = transfer(eth, arb, 1_000_000, BOB, Some(eth.stargate.address()))
            .await
            .unwrap();
        devnet.relay().await;

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(eth.router.operation_to_adapter(&id).unwrap(), eth.stargate.address());
        assert_eq!(arb.ledger.balance_of(&arb.token, &BOB), U256::from(999_400u64));
        // The source pool keeps the full amount, fee included.
        assert_eq!(
            eth.ledger.balance_of(&eth.token, &eth.router.address()),
            U256::zero()
        );
        assert_eq!(
            eth.ledger.balance_of(&eth.token, &eth.stargate.address()),
            pool + U256::from(1_000_000u64)
        );
    }

    #[tokio::test]
    async fn test_stargate_refuses_messages() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();

        let err = send_message(eth, arb, BOB, b"gm", Some(eth.stargate.address()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationNotSupported(_)));
    }

    // =============================================================================
    // CHAINLINK CCIP
    // =============================================================================

    #[tokio::test]
    async fn test_ccip_message_delivery() {
        let devnet = create_test_devnet().await.unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let op = devnet.chain(OPTIMISM).unwrap();
        let inbox = Arc::new(RecordingReceiver::default());
        op.router.bind_receiver(BOB, inbox.clone());

        let id = send_message(arb, op, BOB, b"via ccip", Some(arb.ccip.address()))
            .await
            .unwrap();
        assert_eq!(devnet.ccip_network().pending(), 1);
        assert_eq!(devnet.lz_network().pending(), 0);

        let report = devnet.relay().await;
        assert_eq!(report.failed, 0);
        assert_eq!(arb.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(arb.router.operation_to_adapter(&id).unwrap(), arb.ccip.address());
        assert_eq!(inbox.messages.lock()[0], (id, ARBITRUM, ALICE, b"via ccip".to_vec()));
    }

    #[tokio::test]
    async fn test_ccip_rejects_state_read_without_side_effects() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();

        let err = read_balance(arb, eth, ALICE, Some(arb.ccip.address()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationNotSupported(_)));

        // Dispatching directly fails the same way and burns no nonce.
        let err = arb
            .router
            .read_state(
                &CallContext::with_value(ALICE, U256::from(10_000_000u64)),
                ReadRequest {
                    dest_chain: ETHEREUM,
                    target: VAULT,
                    selector: BALANCE_OF,
                    call_data: vec![],
                    originator: ALICE,
                },
                &options(Some(arb.ccip.address()), 0),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::OperationNotSupported(_)));
        assert_eq!(arb.store.next_nonce().unwrap(), 0);
        assert_eq!(devnet.pending(), 0);
    }

    // =============================================================================
    // SELECTION
    // =============================================================================

    #[tokio::test]
    async fn test_cheapest_adapter_selected() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();

        let best = eth
            .router
            .get_best_adapter(ARBITRUM, &ZERO_ADDRESS, U256::zero(), OperationType::Message)
            .await
            .unwrap();
        let auto = eth
            .router
            .quote(
                ARBITRUM,
                &ZERO_ADDRESS,
                U256::zero(),
                &options(None, 0),
                OperationType::Message,
            )
            .await
            .unwrap();
        assert_eq!(auto.selected_adapter, best);

        for adapter in [eth.lz.address(), eth.ccip.address()] {
            let pinned = eth
                .router
                .quote(
                    ARBITRUM,
                    &ZERO_ADDRESS,
                    U256::zero(),
                    &options(Some(adapter), 0),
                    OperationType::Message,
                )
                .await
                .unwrap();
            assert!(auto.native_fee <= pinned.native_fee);
        }

        // Stargate is never a candidate for messages.
        assert_ne!(best, eth.stargate.address());
    }

    #[tokio::test]
    async fn test_only_layerzero_serves_state_reads() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();

        let best = eth
            .router
            .get_best_adapter(OPTIMISM, &ZERO_ADDRESS, U256::zero(), OperationType::StateRead)
            .await
            .unwrap();
        assert_eq!(best, eth.lz.address());
    }

    // =============================================================================
    // ORDERING AND REPLAY
    // =============================================================================

    #[tokio::test]
    async fn test_out_of_order_receipts_converge() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let mut events = devnet.bus().subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let id = send_message(eth, arb, BOB, b"race", Some(eth.lz.address()))
            .await
            .unwrap();

        // Deliver the message; both receipts are now queued.
        devnet.lz_network().deliver_next().await.unwrap().unwrap();
        assert_eq!(devnet.lz_network().pending(), 2);

        // Completed lands first, the late Delivered is dropped as stale.
        let report = devnet.lz_network().deliver_all_reversed().await;
        assert_eq!(report.delivered, 2);
        assert!(report.failed.is_empty());

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(
            status_trail(&events.drain(), &id),
            vec![OperationStatus::Completed]
        );
    }

    #[tokio::test]
    async fn test_replayed_packet_rejected() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let id = send_message(eth, arb, BOB, b"once", Some(eth.lz.address()))
            .await
            .unwrap();
        devnet.relay().await;

        let operation = eth.router.operation(&id).unwrap().unwrap();
        let err = devnet
            .lz_network()
            .replay(&operation.transport_id)
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::DuplicateDelivery(operation.transport_id));

        assert_eq!(inbox.messages.lock().len(), 1);
        assert_eq!(devnet.pending(), 0);
        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
    }
}
