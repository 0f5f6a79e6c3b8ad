//! # Bridge Router Benchmarks
//!
//! | Path | Work | Target |
//! |------|------|--------|
//! | Operation id | Keccak-256 over the request preimage | < 5µs |
//! | Codec | bincode body plus tag byte, both ways | < 10µs at 4 KiB |
//! | Quote | Fee estimate from every registered adapter | < 100µs |
//! | Round trip | Dispatch, deliver, two receipts | < 1ms |

use bridge_node::{Devnet, NodeConfig};
use bridge_router::adapters::codec::{self, BridgeMessage, MessageBody};
use bridge_router::{
    derive_operation_id, AdapterParams, BridgeOptions, BridgeRouterApi, CallContext,
    MessageRequest, OperationDraft, OperationId, OperationType, U256, ZERO_ADDRESS,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

const ALICE: [u8; 20] = [0x0A; 20];
const BOB: [u8; 20] = [0x0B; 20];

fn draft() -> OperationDraft {
    OperationDraft {
        operation_type: OperationType::TransferAsset,
        source_chain: 1,
        dest_chain: 42161,
        asset: [0x70; 20],
        amount: U256::from(1_000_000u64),
        recipient: BOB,
        originator: ALICE,
    }
}

// ============================================================================
// Operation ids
// ============================================================================

fn bench_operation_id(c: &mut Criterion) {
    let draft = draft();
    let mut nonce = 0u64;
    c.bench_function("derive_operation_id", |b| {
        b.iter(|| {
            nonce += 1;
            black_box(derive_operation_id(&draft, 1_700_000_000, nonce))
        })
    });
}

// ============================================================================
// Wire codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [32usize, 512, 4096] {
        let message = BridgeMessage::Message(MessageBody {
            operation_id: OperationId([0x11; 32]),
            source_chain: 1,
            originator: ALICE,
            recipient: BOB,
            payload: vec![0xAB; size],
        });
        let encoded = codec::encode(&message).unwrap_or_default();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &message, |b, m| {
            b.iter(|| black_box(codec::encode(m)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, bytes| {
            b.iter(|| black_box(codec::decode(bytes)))
        });
    }
    group.finish();
}

// ============================================================================
// Devnet
// ============================================================================

fn bench_devnet(c: &mut Criterion) {
    let runtime = Runtime::new().expect("tokio runtime");
    let devnet = runtime
        .block_on(Devnet::start(&NodeConfig::default()))
        .expect("devnet");
    let [eth, arb, ..] = devnet.chains() else {
        panic!("devnet needs two chains");
    };

    let mut group = c.benchmark_group("devnet");

    group.bench_function("quote_message", |b| {
        b.iter(|| {
            runtime.block_on(eth.router.quote(
                arb.chain_id,
                &ZERO_ADDRESS,
                U256::zero(),
                &BridgeOptions::default(),
                OperationType::Message,
            ))
        })
    });

    let payload = vec![0xCD; 128];
    let options = BridgeOptions {
        specified_adapter: None,
        adapter_params: AdapterParams {
            calldata_size: payload.len() as u32,
            ..AdapterParams::default()
        },
    };
    group.bench_function("message_round_trip", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let quote = eth
                    .router
                    .quote(arb.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::Message)
                    .await?;
                let id = eth
                    .router
                    .send_message(
                        &CallContext::with_value(ALICE, quote.native_fee * 2),
                        MessageRequest {
                            dest_chain: arb.chain_id,
                            recipient: BOB,
                            payload: payload.clone(),
                            originator: ALICE,
                        },
                        &options,
                    )
                    .await?;
                devnet.relay().await;
                Ok::<_, bridge_router::BridgeError>(black_box(id))
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_operation_id, bench_codec, bench_devnet);
criterion_main!(benches);
