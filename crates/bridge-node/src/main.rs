//! # Bridge Node
//!
//! Starts the in-process devnet and runs one operation of every kind across
//! it, then reports the final lifecycle state of each.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `BRIDGE_CONFIG`, `BRIDGE_*` env)
//! 2. Initialize tracing (`RUST_LOG` wins over `BRIDGE_LOG`)
//! 3. Start one router per chain and wire the transports
//! 4. Dispatch the demo operations and relay until quiet

use anyhow::{Context, Result};
use bridge_bus::{BridgeEvent, EventFilter, EventSubscriber, EventTopic};
use bridge_node::{Devnet, NodeConfig, RecordingReceiver};
use bridge_router::{
    AdapterParams, AssetLedger, BridgeAdapter, BridgeOptions, BridgeRouterApi, CallContext,
    ComposeAction, ComposeRequest, MessageRequest, OperationId, OperationType, ReadRequest,
    TransferRequest, U256, ZERO_ADDRESS,
};
use bridge_types::address_hex;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ALICE: [u8; 20] = [0x0A; 20];
const BOB: [u8; 20] = [0x0B; 20];
const VAULT: [u8; 20] = [0x5A; 20];
const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Quoted fee plus a margin for payload sizing differences.
fn with_margin(fee: U256) -> U256 {
    fee + fee / 10
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let devnet = Devnet::start(&config).await.context("starting devnet")?;
    let mut events = devnet.bus().subscribe(EventFilter::all());

    let mut critical = devnet
        .bus()
        .event_stream(EventFilter::topics(vec![EventTopic::DeadLetterQueue]));
    tokio::spawn(async move {
        while let Some(event) = critical.next().await {
            if let BridgeEvent::CriticalError { chain_id, error } = event {
                error!(chain_id, %error, "Critical router error");
            }
        }
    });

    let [first, second, third, ..] = devnet.chains() else {
        anyhow::bail!("the demo needs at least three chains");
    };
    info!(
        a = %first.name,
        b = %second.name,
        c = %third.name,
        "Devnet ready"
    );

    let mut dispatched: Vec<(&str, u64, OperationId)> = Vec::new();

    // Transfer through Stargate, paying its pool fee.
    first.ledger.mint(first.token, ALICE, U256::from(1_000_000u64));
    let amount = U256::from(250_000u64);
    let options = BridgeOptions::with_adapter(first.stargate.address());
    let quote = first
        .router
        .quote(second.chain_id, &first.token, amount, &options, OperationType::TransferAsset)
        .await?;
    info!(native_fee = %quote.native_fee, token_fee = %quote.token_fee, "Stargate transfer quoted");
    let id = first
        .router
        .transfer_assets(
            &CallContext::with_value(ALICE, with_margin(quote.native_fee)),
            TransferRequest {
                dest_chain: second.chain_id,
                asset: first.token,
                amount,
                recipient: BOB,
            },
            &options,
        )
        .await?;
    dispatched.push(("transfer", first.chain_id, id));

    // Message, cheapest adapter.
    let inbox = Arc::new(RecordingReceiver::default());
    third.router.bind_receiver(BOB, inbox.clone());
    let payload = b"hello from the devnet".to_vec();
    let options = BridgeOptions {
        specified_adapter: None,
        adapter_params: AdapterParams {
            calldata_size: payload.len() as u32,
            ..AdapterParams::default()
        },
    };
    let quote = first
        .router
        .quote(third.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::Message)
        .await?;
    let id = first
        .router
        .send_message(
            &CallContext::with_value(ALICE, with_margin(quote.native_fee)),
            MessageRequest {
                dest_chain: third.chain_id,
                recipient: BOB,
                payload,
                originator: ALICE,
            },
            &options,
        )
        .await?;
    dispatched.push(("message", first.chain_id, id));

    // State read answered by the first chain.
    first
        .state
        .set(VAULT, BALANCE_OF, U256::from(42u64).to_string().into_bytes());
    let reader = Arc::new(RecordingReceiver::default());
    third.router.bind_receiver(ALICE, reader.clone());
    let call_data = ALICE.to_vec();
    let options = BridgeOptions {
        specified_adapter: None,
        adapter_params: AdapterParams {
            calldata_size: call_data.len() as u32,
            ..AdapterParams::default()
        },
    };
    let quote = third
        .router
        .quote(first.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::StateRead)
        .await?;
    let id = third
        .router
        .read_state(
            &CallContext::with_value(ALICE, with_margin(quote.native_fee)),
            ReadRequest {
                dest_chain: first.chain_id,
                target: VAULT,
                selector: BALANCE_OF,
                call_data,
                originator: ALICE,
            },
            &options,
        )
        .await?;
    dispatched.push(("read", third.chain_id, id));

    // Compose bundle executed by Alice's own contract on the first chain.
    let executor = Arc::new(RecordingReceiver::default());
    first.router.bind_receiver(ALICE, executor.clone());
    let actions = vec![ComposeAction {
        target: VAULT,
        payload: b"deposit".to_vec(),
    }];
    let options = BridgeOptions {
        specified_adapter: None,
        adapter_params: AdapterParams {
            calldata_size: actions[0].payload.len() as u32,
            ..AdapterParams::default()
        },
    };
    let quote = second
        .router
        .quote(first.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::Compose)
        .await?;
    let id = second
        .router
        .compose_actions(
            &CallContext::with_value(ALICE, with_margin(quote.native_fee)),
            ComposeRequest {
                dest_chain: first.chain_id,
                actions,
            },
            &options,
        )
        .await?;
    dispatched.push(("compose", second.chain_id, id));

    let report = devnet.relay().await;
    info!(delivered = report.delivered, failed = report.failed, "Relay complete");

    for (kind, chain_id, id) in &dispatched {
        let chain = devnet.chain(*chain_id)?;
        let status = chain.router.operation_status(id)?;
        let adapter = chain.router.operation_to_adapter(id)?;
        info!(
            kind = *kind,
            op = %id.short(),
            %status,
            adapter = %address_hex(&adapter),
            "Operation settled"
        );
    }

    info!(
        bob_balance = %second.ledger.balance_of(&second.token, &BOB),
        messages = inbox.messages.lock().len(),
        reads = reader.reads.lock().len(),
        composed = executor.composed.lock().len(),
        events = events.drain().len(),
        "Demo finished"
    );
    Ok(())
}
