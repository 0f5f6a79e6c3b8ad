//! Devnet fixtures shared by the integration flows.
//!
//! Every request helper quotes first and pays the quote plus a tenth, the
//! way a wallet would.

use bridge_bus::BridgeEvent;
use bridge_node::{ChainNode, Devnet, NodeConfig};
use bridge_router::{
    AdapterParams, Address, BridgeError, BridgeOptions, BridgeRouterApi, CallContext,
    ComposeAction, ComposeRequest, MessageRequest, OperationId, OperationStatus, OperationType,
    ReadRequest, TransferRequest, U256, ZERO_ADDRESS,
};

/// Requesting account.
pub const ALICE: Address = [0x0A; 20];
/// Receiving account.
pub const BOB: Address = [0x0B; 20];
/// Contract answering state reads.
pub const VAULT: Address = [0x5A; 20];
/// `balanceOf(address)` selector.
pub const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Ethereum chain id in the default config.
pub const ETHEREUM: u64 = 1;
/// Arbitrum chain id in the default config.
pub const ARBITRUM: u64 = 42161;
/// Optimism chain id in the default config.
pub const OPTIMISM: u64 = 10;

/// Devnet with the default three chains.
pub async fn create_test_devnet() -> Result<Devnet, BridgeError> {
    Devnet::start(&NodeConfig::default()).await
}

/// Devnet with `liquidity` minted to every adapter.
pub async fn create_test_devnet_with_liquidity(liquidity: u64) -> Result<Devnet, BridgeError> {
    let config = NodeConfig {
        adapter_liquidity: liquidity,
        ..NodeConfig::default()
    };
    Devnet::start(&config).await
}

/// Options pinning `adapter` (if any) with a payload-sized budget.
pub fn options(adapter: Option<Address>, calldata_size: usize) -> BridgeOptions {
    BridgeOptions {
        specified_adapter: adapter,
        adapter_params: AdapterParams {
            calldata_size: calldata_size as u32,
            ..AdapterParams::default()
        },
    }
}

/// Call from `sender` paying `fee` plus a tenth.
pub fn paid(sender: Address, fee: U256) -> CallContext {
    CallContext::with_value(sender, fee + fee / 10)
}

/// Transfer `amount` of the source token from Alice to `recipient`.
pub async fn transfer(
    src: &ChainNode,
    dest: &ChainNode,
    amount: u64,
    recipient: Address,
    adapter: Option<Address>,
) -> Result<OperationId, BridgeError> {
    let amount = U256::from(amount);
    let options = options(adapter, 0);
    let quote = src
        .router
        .quote(dest.chain_id, &src.token, amount, &options, OperationType::TransferAsset)
        .await?;
    src.router
        .transfer_assets(
            &paid(ALICE, quote.native_fee),
            TransferRequest {
                dest_chain: dest.chain_id,
                asset: src.token,
                amount,
                recipient,
            },
            &options,
        )
        .await
}

/// Send `payload` from Alice to `recipient`.
pub async fn send_message(
    src: &ChainNode,
    dest: &ChainNode,
    recipient: Address,
    payload: &[u8],
    adapter: Option<Address>,
) -> Result<OperationId, BridgeError> {
    let options = options(adapter, payload.len());
    let quote = src
        .router
        .quote(dest.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::Message)
        .await?;
    src.router
        .send_message(
            &paid(ALICE, quote.native_fee),
            MessageRequest {
                dest_chain: dest.chain_id,
                recipient,
                payload: payload.to_vec(),
                originator: ALICE,
            },
            &options,
        )
        .await
}

/// Read `VAULT.balanceOf(ALICE)` on `dest` on behalf of `originator`.
pub async fn read_balance(
    src: &ChainNode,
    dest: &ChainNode,
    originator: Address,
    adapter: Option<Address>,
) -> Result<OperationId, BridgeError> {
    let call_data = ALICE.to_vec();
    let options = options(adapter, call_data.len());
    let quote = src
        .router
        .quote(dest.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::StateRead)
        .await?;
    src.router
        .read_state(
            &paid(ALICE, quote.native_fee),
            ReadRequest {
                dest_chain: dest.chain_id,
                target: VAULT,
                selector: BALANCE_OF,
                call_data,
                originator,
            },
            &options,
        )
        .await
}

/// Compose `actions` from Alice, executed by Alice's contract on `dest`.
pub async fn compose(
    src: &ChainNode,
    dest: &ChainNode,
    actions: Vec<ComposeAction>,
    adapter: Option<Address>,
) -> Result<OperationId, BridgeError> {
    let size = actions.iter().map(|a| a.payload.len()).sum();
    let options = options(adapter, size);
    let quote = src
        .router
        .quote(dest.chain_id, &ZERO_ADDRESS, U256::zero(), &options, OperationType::Compose)
        .await?;
    src.router
        .compose_actions(
            &paid(ALICE, quote.native_fee),
            ComposeRequest {
                dest_chain: dest.chain_id,
                actions,
            },
            &options,
        )
        .await
}

/// Status transitions recorded for `id`, in publish order.
pub fn status_trail(events: &[BridgeEvent], id: &OperationId) -> Vec<OperationStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            BridgeEvent::OperationStatusUpdated {
                operation_id, to, ..
            } if operation_id == id => Some(*to),
            _ => None,
        })
        .collect()
}
