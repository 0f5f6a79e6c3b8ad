//! # Operation Lifecycle Across Routers
//!
//! Source-side status is driven only by receipts from the destination:
//!
//! ```text
//! source router            transport            destination router
//!   dispatch ── PENDING ──────────────────────→ notify_message_received
//!   DELIVERED ←──────────── Receipt(Delivered) ──┤
//!   COMPLETED | FAILED ←── Receipt(outcome) ─────┘
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bridge_bus::{BridgeEvent, EventFilter, EventSubscriber, EventTopic};
    use bridge_node::RecordingReceiver;
    use bridge_router::{
        AssetLedger, BridgeAdapter, BridgeRouterApi, ComposeAction, OperationStatus, U256,
    };

    use crate::fixtures::*;

    // =============================================================================
    // MESSAGES
    // =============================================================================

    #[tokio::test]
    async fn test_message_lifecycle_pending_delivered_completed() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let mut events = devnet.bus().subscribe(EventFilter::all());

        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let id = send_message(eth, arb, BOB, b"gm", Some(eth.lz.address()))
            .await
            .unwrap();
        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Pending);
        assert_eq!(devnet.pending(), 1);

        let report = devnet.relay().await;
        assert_eq!(report.failed, 0);
        assert_eq!(report.delivered, 3);

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        let events = events.drain();
        assert_eq!(
            status_trail(&events, &id),
            vec![OperationStatus::Delivered, OperationStatus::Completed]
        );

        let messages = inbox.messages.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0], (id, ETHEREUM, ALICE, b"gm".to_vec()));

        assert!(events.iter().any(|e| matches!(
            e,
            BridgeEvent::MessageReceived { chain_id: ARBITRUM, operation_id, executed: true, .. }
                if *operation_id == id
        )));
    }

    #[tokio::test]
    async fn test_message_to_unbound_recipient_fails() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let mut events = devnet.bus().subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));

        let id = send_message(eth, arb, BOB, b"anyone there?", Some(eth.lz.address()))
            .await
            .unwrap();
        devnet.relay().await;

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Failed);
        assert_eq!(
            status_trail(&events.drain(), &id),
            vec![OperationStatus::Delivered, OperationStatus::Failed]
        );
    }

    // =============================================================================
    // TRANSFERS
    // =============================================================================

    #[tokio::test]
    async fn test_transfer_escrows_and_releases() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        eth.ledger.mint(eth.token, ALICE, U256::from(10_000u64));
        let locked = eth.ledger.balance_of(&eth.token, &eth.lz.address());
        let liquidity = arb.ledger.balance_of(&arb.token, &arb.lz.address());

        let id = transfer(eth, arb, 5_000, BOB, Some(eth.lz.address()))
            .await
            .unwrap();
        assert_eq!(eth.ledger.balance_of(&eth.token, &ALICE), U256::from(5_000u64));
        // The router passes the deposit straight through to the adapter lock.
        assert_eq!(
            eth.ledger.balance_of(&eth.token, &eth.router.address()),
            U256::zero()
        );
        assert_eq!(
            eth.ledger.balance_of(&eth.token, &eth.lz.address()),
            locked + U256::from(5_000u64)
        );

        devnet.relay().await;

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(arb.ledger.balance_of(&arb.token, &BOB), U256::from(5_000u64));
        assert_eq!(
            arb.ledger.balance_of(&arb.token, &arb.lz.address()),
            liquidity - U256::from(5_000u64)
        );
    }

    #[tokio::test]
    async fn test_transfer_without_destination_liquidity_fails() {
        let devnet = create_test_devnet_with_liquidity(100).await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        eth.ledger.mint(eth.token, ALICE, U256::from(5_000u64));

        let id = transfer(eth, arb, 5_000, BOB, Some(eth.lz.address()))
            .await
            .unwrap();
        devnet.relay().await;

        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Failed);
        assert_eq!(arb.ledger.balance_of(&arb.token, &BOB), U256::zero());
        // No automatic refund: the deposit stays locked with the source adapter.
        assert_eq!(eth.ledger.balance_of(&eth.token, &ALICE), U256::zero());
        assert_eq!(
            eth.ledger.balance_of(&eth.token, &eth.lz.address()),
            U256::from(5_100u64)
        );
    }

    // =============================================================================
    // STATE READS
    // =============================================================================

    #[tokio::test]
    async fn test_read_round_trip() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let op = devnet.chain(OPTIMISM).unwrap();
        let mut events = devnet.bus().subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));

        eth.state.set(VAULT, BALANCE_OF, b"42".to_vec());
        let reader = Arc::new(RecordingReceiver::default());
        op.router.bind_receiver(ALICE, reader.clone());

        let id = read_balance(op, eth, ALICE, None).await.unwrap();
        assert_eq!(op.router.operation_to_adapter(&id).unwrap(), op.lz.address());
        assert_eq!(op.router.read_request_originator(&id).unwrap(), ALICE);
        assert_eq!(op.router.read_response(&id).unwrap(), None);

        devnet.relay().await;

        assert_eq!(op.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(op.router.read_response(&id).unwrap(), Some(b"42".to_vec()));
        assert_eq!(reader.reads.lock().as_slice(), &[(id, b"42".to_vec())]);
        assert!(events.drain().iter().any(|e| matches!(
            e,
            BridgeEvent::ReadResponseDelivered { operation_id, receiver_notified: true, .. }
                if *operation_id == id
        )));
    }

    #[tokio::test]
    async fn test_read_with_failing_originator_stays_completed() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let op = devnet.chain(OPTIMISM).unwrap();
        let mut events = devnet.bus().subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));

        eth.state.set(VAULT, BALANCE_OF, b"42".to_vec());
        let reader = Arc::new(RecordingReceiver::failing());
        op.router.bind_receiver(ALICE, reader.clone());

        let id = read_balance(op, eth, ALICE, None).await.unwrap();
        let report = devnet.relay().await;

        assert_eq!(report.failed, 0);
        assert_eq!(op.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        assert_eq!(op.router.read_response(&id).unwrap(), Some(b"42".to_vec()));
        assert!(reader.reads.lock().is_empty());
        assert!(events.drain().iter().any(|e| matches!(
            e,
            BridgeEvent::ReadResponseDelivered { operation_id, receiver_notified: false, .. }
                if *operation_id == id
        )));
    }

    #[tokio::test]
    async fn test_read_of_missing_state_fails() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let op = devnet.chain(OPTIMISM).unwrap();
        let reader = Arc::new(RecordingReceiver::default());
        op.router.bind_receiver(ALICE, reader.clone());

        let id = read_balance(op, eth, ALICE, None).await.unwrap();
        devnet.relay().await;

        assert_eq!(op.router.operation_status(&id).unwrap(), OperationStatus::Failed);
        assert_eq!(op.router.read_response(&id).unwrap(), None);
        assert!(reader.reads.lock().is_empty());
    }

    // =============================================================================
    // COMPOSE
    // =============================================================================

    #[tokio::test]
    async fn test_compose_executed_by_originator_contract() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let executor = Arc::new(RecordingReceiver::default());
        eth.router.bind_receiver(ALICE, executor.clone());

        let actions = vec![
            ComposeAction {
                target: VAULT,
                payload: b"approve".to_vec(),
            },
            ComposeAction {
                target: VAULT,
                payload: b"deposit".to_vec(),
            },
        ];
        let id = compose(arb, eth, actions, None).await.unwrap();
        devnet.relay().await;

        assert_eq!(arb.router.operation_status(&id).unwrap(), OperationStatus::Completed);
        let composed = executor.composed.lock();
        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].0, id);
        assert_eq!(composed[0].1.len(), 2);
        assert_eq!(composed[0].1[1].payload, b"deposit".to_vec());
    }
}
