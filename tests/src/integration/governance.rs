//! # Governance and Identity
//!
//! Pause gating, registry changes while operations are in flight, and
//! operation id uniqueness under identical requests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bridge_node::RecordingReceiver;
    use bridge_router::{
        BridgeAdapter, BridgeError, BridgeRouterApi, CallContext, OperationStatus, U256,
    };

    use crate::fixtures::*;

    // =============================================================================
    // PAUSE
    // =============================================================================

    #[tokio::test]
    async fn test_pause_blocks_new_dispatch_but_not_in_flight() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let in_flight = send_message(eth, arb, BOB, b"before", None).await.unwrap();

        eth.router
            .pause(&CallContext::new(devnet.guardian()))
            .await
            .unwrap();
        assert!(eth.router.is_paused().unwrap());

        let err = send_message(eth, arb, BOB, b"during", None).await.unwrap_err();
        assert_eq!(err, BridgeError::Paused);

        // Receipts still resolve operations dispatched before the pause.
        devnet.relay().await;
        assert_eq!(
            eth.router.operation_status(&in_flight).unwrap(),
            OperationStatus::Completed
        );

        // Other chains are unaffected.
        assert!(!arb.router.is_paused().unwrap());

        eth.router
            .unpause(&CallContext::new(devnet.governor()))
            .await
            .unwrap();
        send_message(eth, arb, BOB, b"after", None).await.unwrap();
        devnet.relay().await;
        assert_eq!(inbox.messages.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_pause_roles() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();

        let err = eth.router.pause(&CallContext::new(ALICE)).await.unwrap_err();
        assert_eq!(err, BridgeError::Unauthorized(ALICE));

        eth.router
            .pause(&CallContext::new(devnet.guardian()))
            .await
            .unwrap();
        let err = eth
            .router
            .unpause(&CallContext::new(devnet.guardian()))
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::Unauthorized(devnet.guardian()));
        assert!(eth.router.is_paused().unwrap());
    }

    // =============================================================================
    // REGISTRY
    // =============================================================================

    #[tokio::test]
    async fn test_removed_adapter_still_resolves_in_flight_operations() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let governor = CallContext::new(devnet.governor());
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let id = send_message(eth, arb, BOB, b"in flight", Some(eth.lz.address()))
            .await
            .unwrap();
        eth.router
            .remove_adapter(&governor, eth.lz.address())
            .await
            .unwrap();
        assert_eq!(
            eth.router.get_adapters(),
            vec![eth.stargate.address(), eth.ccip.address()]
        );

        devnet.relay().await;
        assert_eq!(eth.router.operation_status(&id).unwrap(), OperationStatus::Completed);

        // Pinning the removed adapter is refused; selection falls back to CCIP.
        let err = send_message(eth, arb, BOB, b"pinned", Some(eth.lz.address()))
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::UnknownAdapter(eth.lz.address()));

        let id = send_message(eth, arb, BOB, b"auto", None).await.unwrap();
        assert_eq!(eth.router.operation_to_adapter(&id).unwrap(), eth.ccip.address());

        // Re-registering appends at the end.
        eth.router
            .register_adapter(&governor, eth.lz.clone())
            .await
            .unwrap();
        assert_eq!(
            eth.router.get_adapters(),
            vec![eth.stargate.address(), eth.ccip.address(), eth.lz.address()]
        );
    }

    // =============================================================================
    // OPERATION IDS
    // =============================================================================

    #[tokio::test]
    async fn test_identical_requests_same_second_get_unique_ids() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let inbox = Arc::new(RecordingReceiver::default());
        arb.router.bind_receiver(BOB, inbox.clone());

        let first = send_message(eth, arb, BOB, b"same", None).await.unwrap();
        let second = send_message(eth, arb, BOB, b"same", None).await.unwrap();
        assert_ne!(first, second);

        let a = eth.router.operation(&first).unwrap().unwrap();
        let b = eth.router.operation(&second).unwrap().unwrap();
        assert_eq!(a.created_at, b.created_at);
        assert_eq!((a.nonce, b.nonce), (0, 1));

        devnet.relay().await;
        assert_eq!(eth.router.operation_status(&first).unwrap(), OperationStatus::Completed);
        assert_eq!(eth.router.operation_status(&second).unwrap(), OperationStatus::Completed);
        assert_eq!(inbox.messages.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_ids_differ_across_chains() {
        let devnet = create_test_devnet().await.unwrap();
        let eth = devnet.chain(ETHEREUM).unwrap();
        let arb = devnet.chain(ARBITRUM).unwrap();
        let op = devnet.chain(OPTIMISM).unwrap();

        let from_eth = send_message(eth, op, BOB, b"same", None).await.unwrap();
        let from_arb = send_message(arb, op, BOB, b"same", None).await.unwrap();
        assert_ne!(from_eth, from_arb);
    }

    // =============================================================================
    // PERSISTENCE
    // =============================================================================

    #[cfg(feature = "rocksdb")]
    #[tokio::test]
    async fn test_operations_survive_restart() {
        use bridge_node::{Devnet, NodeConfig};
        use bridge_router::adapters::RocksDbOperationStore;
        use bridge_router::OperationStore;

        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..NodeConfig::default()
        };

        let id = {
            let devnet = Devnet::start(&config).await.unwrap();
            let eth = devnet.chain(ETHEREUM).unwrap();
            let arb = devnet.chain(ARBITRUM).unwrap();
            arb.router
                .bind_receiver(BOB, Arc::new(RecordingReceiver::default()));
            let id = send_message(eth, arb, BOB, b"durable", None).await.unwrap();
            devnet.relay().await;
            id
        };

        let store = RocksDbOperationStore::open(dir.path().join(format!("chain-{ETHEREUM}")))
            .unwrap();
        let operation = store.get_operation(&id).unwrap().unwrap();
        assert_eq!(operation.status, OperationStatus::Completed);
        assert_eq!(store.next_nonce().unwrap(), 1);
    }
}
