//! # Bridge Router Service
//!
//! Registry of bridge adapters, adapter selection, operation dispatch and
//! the lifecycle callbacks adapters use to resolve operations.
//!
//! All state-changing entry points are serialized by one async transaction
//! lock, modelling sequential transaction processing on a single chain. A
//! failing call leaves no state behind. Receiver callbacks run after the
//! lock is released, so receivers may call back into the router.

use crate::algorithms::{derive_operation_id, select_best_adapter};
use crate::domain::{
    address_hex, invariant_forward_transition, invariant_valid_compose, invariant_valid_message,
    invariant_valid_params, invariant_valid_read, invariant_valid_transfer, is_zero_address,
    Address, BridgeError, BridgeOptions, CallContext, ChainId, ComposeAction, ComposeRequest, DeliveryOutcome,
    DispatchContext, DispatchReceipt, FeeQuote, InboundDelivery, InboundPayload, MessageRequest,
    Operation, OperationDraft, OperationId, OperationStatus, OperationType, ReadRequest,
    RouterConfig, TransferRequest, U256, ZERO_ADDRESS,
};
use crate::ports::inbound::{BridgeRouterApi, RouterGateway};
use crate::ports::outbound::{
    AccessControl, AssetLedger, BridgeAdapter, BridgeReceiver, Clock, OperationStore,
};
use async_trait::async_trait;
use bridge_bus::{BridgeEvent, EventPublisher};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// What an operation carries to its adapter.
enum DispatchPayload {
    Transfer {
        asset: Address,
        amount: U256,
        recipient: Address,
    },
    Read {
        target: Address,
        selector: [u8; 4],
        call_data: Vec<u8>,
    },
    Message {
        recipient: Address,
        payload: Vec<u8>,
    },
    Compose {
        actions: Vec<ComposeAction>,
    },
}

impl DispatchPayload {
    async fn send(
        &self,
        adapter: &dyn BridgeAdapter,
        ctx: &DispatchContext,
    ) -> Result<DispatchReceipt, BridgeError> {
        match self {
            Self::Transfer {
                asset,
                amount,
                recipient,
            } => adapter.transfer_asset(ctx, asset, *amount, recipient).await,
            Self::Read {
                target,
                selector,
                call_data,
            } => adapter.read_state(ctx, target, *selector, call_data).await,
            Self::Message { recipient, payload } => {
                adapter.send_message(ctx, recipient, payload).await
            }
            Self::Compose { actions } => adapter.compose_actions(ctx, actions).await,
        }
    }
}

/// Bridge router for one chain.
pub struct BridgeRouter {
    config: RouterConfig,
    access: Arc<dyn AccessControl>,
    ledger: Arc<dyn AssetLedger>,
    store: Arc<dyn OperationStore>,
    clock: Arc<dyn Clock>,
    events: Option<Arc<dyn EventPublisher>>,
    registry: RwLock<Vec<Arc<dyn BridgeAdapter>>>,
    receivers: RwLock<HashMap<Address, Arc<dyn BridgeReceiver>>>,
    tx_lock: tokio::sync::Mutex<()>,
}

impl BridgeRouter {
    /// Create a router with an empty registry.
    pub fn new(
        config: RouterConfig,
        access: Arc<dyn AccessControl>,
        ledger: Arc<dyn AssetLedger>,
        store: Arc<dyn OperationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            access,
            ledger,
            store,
            clock,
            events: None,
            registry: RwLock::new(Vec::new()),
            receivers: RwLock::new(HashMap::new()),
            tx_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Publish lifecycle events to `publisher`.
    pub fn with_events(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(publisher);
        self
    }

    /// Router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Router address.
    pub fn address(&self) -> Address {
        self.config.router_address
    }

    /// Callback handle for adapters.
    pub fn gateway(self: &Arc<Self>) -> Weak<dyn RouterGateway> {
        let weak: Weak<Self> = Arc::downgrade(self);
        weak
    }

    async fn emit(&self, event: BridgeEvent) {
        if let Some(events) = &self.events {
            events.publish(event).await;
        }
    }

    async fn emit_critical(&self, message: String) {
        error!("[router] {}", message);
        self.emit(BridgeEvent::CriticalError {
            chain_id: self.config.chain_id,
            error: message,
        })
        .await;
    }

    fn require_governor(&self, ctx: &CallContext) -> Result<(), BridgeError> {
        if !self.access.is_governor(&ctx.sender) {
            return Err(BridgeError::Unauthorized(ctx.sender));
        }
        Ok(())
    }

    fn adapters(&self) -> Vec<Arc<dyn BridgeAdapter>> {
        self.registry.read().clone()
    }

    fn find_adapter(&self, address: &Address) -> Result<Arc<dyn BridgeAdapter>, BridgeError> {
        self.registry
            .read()
            .iter()
            .find(|a| a.address() == *address)
            .cloned()
            .ok_or(BridgeError::UnknownAdapter(*address))
    }

    fn load(&self, id: &OperationId) -> Result<Operation, BridgeError> {
        self.store
            .get_operation(id)?
            .ok_or(BridgeError::UnknownOperation(*id))
    }

    /// The assigned adapter may always resolve its operation, even after
    /// removal. Anyone else is rejected.
    fn authorize_callback(&self, caller: &Address, operation: &Operation) -> Result<(), BridgeError> {
        if *caller == operation.assigned_adapter() {
            return Ok(());
        }
        if !self.is_valid_adapter(caller) {
            return Err(BridgeError::UnknownAdapter(*caller));
        }
        Err(BridgeError::Unauthorized(*caller))
    }

    async fn resolve_adapter(
        &self,
        draft: &OperationDraft,
        options: &BridgeOptions,
    ) -> Result<Arc<dyn BridgeAdapter>, BridgeError> {
        if let Some(address) = options.adapter() {
            return self.find_adapter(&address);
        }
        let selection = select_best_adapter(
            &self.adapters(),
            draft.dest_chain,
            &draft.asset,
            draft.amount,
            &options.adapter_params,
            draft.operation_type,
        )
        .await?;
        Ok(selection.adapter)
    }

    /// Common dispatch path. Params are already validated.
    async fn dispatch(
        &self,
        ctx: &CallContext,
        draft: OperationDraft,
        payload: DispatchPayload,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError> {
        let guard = self.tx_lock.lock().await;

        if self.store.is_paused()? {
            return Err(BridgeError::Paused);
        }
        invariant_valid_params(&options.adapter_params)?;

        let adapter = self.resolve_adapter(&draft, options).await?;

        let nonce = self.store.next_nonce()?;
        let now = self.clock.now();
        let id = derive_operation_id(&draft, now, nonce);
        if self.store.get_operation(&id)?.is_some() {
            return Err(BridgeError::OperationIdCollision(id));
        }

        let router = self.config.router_address;
        if let DispatchPayload::Transfer { asset, amount, .. } = &payload {
            self.ledger.transfer(asset, &ctx.sender, &router, *amount)?;
        }

        let dispatch_ctx = DispatchContext {
            caller: router,
            value: ctx.value,
            operation_id: id,
            source_chain: self.config.chain_id,
            dest_chain: draft.dest_chain,
            originator: draft.originator,
            params: options.adapter_params.clone(),
        };

        let receipt = match payload.send(adapter.as_ref(), &dispatch_ctx).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.reverse_pull(ctx, &payload).await;
                debug!(op = %id.short(), adapter = adapter.name(), error = %e, "[router] Dispatch failed");
                return Err(e);
            }
        };

        let operation = Operation::new(id, &draft, adapter.address(), nonce, receipt.transport_id, now);
        if let Err(e) = self.store.commit_dispatch(&operation, nonce + 1) {
            // The packet is already in flight, so the pull stands.
            self.emit_critical(format!(
                "operation {} dispatched but not recorded: {}",
                id, e
            ))
            .await;
            return Err(e);
        }
        drop(guard);

        info!(
            op = %id.short(),
            kind = %draft.operation_type,
            dest_chain = draft.dest_chain,
            adapter = adapter.name(),
            fee = %receipt.native_fee,
            "[router] Operation dispatched"
        );

        self.emit(BridgeEvent::OperationDispatched {
            chain_id: self.config.chain_id,
            operation_id: id,
            operation_type: draft.operation_type,
            dest_chain: draft.dest_chain,
            adapter: adapter.address(),
            originator: draft.originator,
        })
        .await;

        Ok(id)
    }

    async fn reverse_pull(&self, ctx: &CallContext, payload: &DispatchPayload) {
        let DispatchPayload::Transfer { asset, amount, .. } = payload else {
            return;
        };
        if let Err(e) = self
            .ledger
            .transfer(asset, &self.config.router_address, &ctx.sender, *amount)
        {
            self.emit_critical(format!(
                "failed to return {} of {} to {}: {}",
                amount,
                address_hex(asset),
                address_hex(&ctx.sender),
                e
            ))
            .await;
        }
    }

    async fn execute_inbound(
        &self,
        caller: &Address,
        delivery: &InboundDelivery,
    ) -> DeliveryOutcome {
        let receiver = self.receivers.read().get(&delivery.recipient).cloned();
        let id = delivery.operation_id;

        match &delivery.payload {
            InboundPayload::Transfer { asset, amount } => {
                if let Err(e) = self
                    .ledger
                    .transfer(asset, caller, &delivery.recipient, *amount)
                {
                    warn!(op = %id.short(), error = %e, "[router] Release failed");
                    return DeliveryOutcome::Rejected(e.to_string());
                }
                if let Some(receiver) = receiver {
                    if let Err(e) = receiver
                        .on_asset_received(id, delivery.source_chain, asset, *amount)
                        .await
                    {
                        warn!(op = %id.short(), error = %e, "[router] Asset hook failed");
                    }
                }
                DeliveryOutcome::Executed
            }
            InboundPayload::Message(payload) => {
                let Some(receiver) = receiver else {
                    return no_receiver(&delivery.recipient);
                };
                match receiver
                    .on_message_received(id, delivery.source_chain, &delivery.originator, payload)
                    .await
                {
                    Ok(()) => DeliveryOutcome::Executed,
                    Err(e) => DeliveryOutcome::Rejected(e.to_string()),
                }
            }
            InboundPayload::Compose(actions) => {
                let Some(receiver) = receiver else {
                    return no_receiver(&delivery.recipient);
                };
                match receiver.on_compose(id, delivery.source_chain, actions).await {
                    Ok(()) => DeliveryOutcome::Executed,
                    Err(e) => DeliveryOutcome::Rejected(e.to_string()),
                }
            }
        }
    }
}

fn no_receiver(recipient: &Address) -> DeliveryOutcome {
    DeliveryOutcome::Rejected(format!("no receiver at {}", address_hex(recipient)))
}

#[async_trait]
impl BridgeRouterApi for BridgeRouter {
    async fn register_adapter(
        &self,
        ctx: &CallContext,
        adapter: Arc<dyn BridgeAdapter>,
    ) -> Result<(), BridgeError> {
        self.require_governor(ctx)?;
        let address = adapter.address();
        if is_zero_address(&address) {
            return Err(BridgeError::InvalidParams("adapter address is zero".into()));
        }

        let _guard = self.tx_lock.lock().await;
        {
            let mut registry = self.registry.write();
            if registry.iter().any(|a| a.address() == address) {
                return Err(BridgeError::AdapterAlreadyRegistered(address));
            }
            if registry.len() >= self.config.max_adapters {
                return Err(BridgeError::AdapterLimitReached(self.config.max_adapters));
            }
            registry.push(adapter.clone());
        }

        info!(adapter = adapter.name(), address = %address_hex(&address), "[router] Adapter registered");
        self.emit(BridgeEvent::AdapterRegistered {
            chain_id: self.config.chain_id,
            adapter: address,
        })
        .await;
        Ok(())
    }

    async fn remove_adapter(&self, ctx: &CallContext, adapter: Address) -> Result<(), BridgeError> {
        self.require_governor(ctx)?;

        let _guard = self.tx_lock.lock().await;
        {
            let mut registry = self.registry.write();
            let index = registry
                .iter()
                .position(|a| a.address() == adapter)
                .ok_or(BridgeError::UnknownAdapter(adapter))?;
            registry.remove(index);
        }

        info!(address = %address_hex(&adapter), "[router] Adapter removed");
        self.emit(BridgeEvent::AdapterRemoved {
            chain_id: self.config.chain_id,
            adapter,
        })
        .await;
        Ok(())
    }

    fn get_adapters(&self) -> Vec<Address> {
        self.registry.read().iter().map(|a| a.address()).collect()
    }

    fn is_valid_adapter(&self, adapter: &Address) -> bool {
        self.registry.read().iter().any(|a| a.address() == *adapter)
    }

    async fn get_best_adapter(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        operation: OperationType,
    ) -> Result<Address, BridgeError> {
        let selection = select_best_adapter(
            &self.adapters(),
            dest_chain,
            asset,
            amount,
            &Default::default(),
            operation,
        )
        .await?;
        Ok(selection.adapter.address())
    }

    async fn quote(
        &self,
        dest_chain: ChainId,
        asset: &Address,
        amount: U256,
        options: &BridgeOptions,
        operation: OperationType,
    ) -> Result<FeeQuote, BridgeError> {
        invariant_valid_params(&options.adapter_params)?;
        let (adapter, estimate) = match options.adapter() {
            Some(address) => {
                let adapter = self.find_adapter(&address)?;
                let estimate = adapter
                    .estimate_fee(dest_chain, asset, amount, &options.adapter_params, operation)
                    .await?;
                (adapter, estimate)
            }
            None => {
                let selection = select_best_adapter(
                    &self.adapters(),
                    dest_chain,
                    asset,
                    amount,
                    &options.adapter_params,
                    operation,
                )
                .await?;
                (selection.adapter, selection.estimate)
            }
        };

        Ok(FeeQuote {
            native_fee: estimate.native_fee,
            token_fee: estimate.token_fee,
            selected_adapter: adapter.address(),
        })
    }

    async fn transfer_assets(
        &self,
        ctx: &CallContext,
        request: TransferRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError> {
        invariant_valid_transfer(self.config.chain_id, &request)?;
        let draft = OperationDraft {
            operation_type: OperationType::TransferAsset,
            source_chain: self.config.chain_id,
            dest_chain: request.dest_chain,
            asset: request.asset,
            amount: request.amount,
            recipient: request.recipient,
            originator: ctx.sender,
        };
        let payload = DispatchPayload::Transfer {
            asset: request.asset,
            amount: request.amount,
            recipient: request.recipient,
        };
        self.dispatch(ctx, draft, payload, options).await
    }

    async fn read_state(
        &self,
        ctx: &CallContext,
        request: ReadRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError> {
        invariant_valid_read(&request)?;
        let draft = OperationDraft {
            operation_type: OperationType::StateRead,
            source_chain: self.config.chain_id,
            dest_chain: request.dest_chain,
            asset: ZERO_ADDRESS,
            amount: U256::zero(),
            recipient: request.target,
            originator: request.originator,
        };
        let payload = DispatchPayload::Read {
            target: request.target,
            selector: request.selector,
            call_data: request.call_data,
        };
        self.dispatch(ctx, draft, payload, options).await
    }

    async fn send_message(
        &self,
        ctx: &CallContext,
        request: MessageRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError> {
        invariant_valid_message(&request)?;
        let draft = OperationDraft {
            operation_type: OperationType::Message,
            source_chain: self.config.chain_id,
            dest_chain: request.dest_chain,
            asset: ZERO_ADDRESS,
            amount: U256::zero(),
            recipient: request.recipient,
            originator: request.originator,
        };
        let payload = DispatchPayload::Message {
            recipient: request.recipient,
            payload: request.payload,
        };
        self.dispatch(ctx, draft, payload, options).await
    }

    async fn compose_actions(
        &self,
        ctx: &CallContext,
        request: ComposeRequest,
        options: &BridgeOptions,
    ) -> Result<OperationId, BridgeError> {
        invariant_valid_compose(&request)?;
        let draft = OperationDraft {
            operation_type: OperationType::Compose,
            source_chain: self.config.chain_id,
            dest_chain: request.dest_chain,
            asset: ZERO_ADDRESS,
            amount: U256::zero(),
            recipient: ctx.sender,
            originator: ctx.sender,
        };
        let payload = DispatchPayload::Compose {
            actions: request.actions,
        };
        self.dispatch(ctx, draft, payload, options).await
    }

    async fn pause(&self, ctx: &CallContext) -> Result<(), BridgeError> {
        if !self.access.is_guardian(&ctx.sender) && !self.access.is_governor(&ctx.sender) {
            return Err(BridgeError::Unauthorized(ctx.sender));
        }
        {
            let _guard = self.tx_lock.lock().await;
            self.store.set_paused(true)?;
        }

        warn!(by = %address_hex(&ctx.sender), "[router] Paused");
        self.emit(BridgeEvent::Paused {
            chain_id: self.config.chain_id,
            by: ctx.sender,
        })
        .await;
        Ok(())
    }

    async fn unpause(&self, ctx: &CallContext) -> Result<(), BridgeError> {
        self.require_governor(ctx)?;
        {
            let _guard = self.tx_lock.lock().await;
            self.store.set_paused(false)?;
        }

        info!(by = %address_hex(&ctx.sender), "[router] Unpaused");
        self.emit(BridgeEvent::Unpaused {
            chain_id: self.config.chain_id,
            by: ctx.sender,
        })
        .await;
        Ok(())
    }

    fn is_paused(&self) -> Result<bool, BridgeError> {
        self.store.is_paused()
    }

    fn operation(&self, id: &OperationId) -> Result<Option<Operation>, BridgeError> {
        self.store.get_operation(id)
    }

    fn operation_status(&self, id: &OperationId) -> Result<OperationStatus, BridgeError> {
        Ok(self.load(id)?.status)
    }

    fn operation_to_adapter(&self, id: &OperationId) -> Result<Address, BridgeError> {
        Ok(self.load(id)?.assigned_adapter())
    }

    fn read_request_originator(&self, id: &OperationId) -> Result<Address, BridgeError> {
        let operation = self.load(id)?;
        if operation.operation_type != OperationType::StateRead {
            return Err(BridgeError::InvalidParams(format!(
                "operation {} is not a state read",
                id
            )));
        }
        Ok(operation.originator)
    }

    fn read_response(&self, id: &OperationId) -> Result<Option<Vec<u8>>, BridgeError> {
        Ok(self.load(id)?.response)
    }

    fn bind_receiver(&self, address: Address, receiver: Arc<dyn BridgeReceiver>) {
        self.receivers.write().insert(address, receiver);
    }
}

#[async_trait]
impl RouterGateway for BridgeRouter {
    fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    async fn update_operation_status(
        &self,
        caller: Address,
        id: OperationId,
        status: OperationStatus,
    ) -> Result<(), BridgeError> {
        let from = {
            let _guard = self.tx_lock.lock().await;
            let mut operation = self.load(&id)?;
            self.authorize_callback(&caller, &operation)?;
            invariant_forward_transition(operation.status, status)?;

            let from = operation.status;
            operation.status = status;
            operation.updated_at = self.clock.now();
            self.store.put_operation(&operation)?;
            from
        };

        debug!(op = %id.short(), %from, to = %status, "[router] Status updated");
        self.emit(BridgeEvent::OperationStatusUpdated {
            chain_id: self.config.chain_id,
            operation_id: id,
            from,
            to: status,
        })
        .await;
        Ok(())
    }

    async fn deliver_read_response(
        &self,
        caller: Address,
        id: OperationId,
        data: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let (from, originator) = {
            let _guard = self.tx_lock.lock().await;
            let mut operation = self.load(&id)?;
            self.authorize_callback(&caller, &operation)?;
            if operation.operation_type != OperationType::StateRead {
                return Err(BridgeError::InvalidParams(format!(
                    "operation {} is not a state read",
                    id
                )));
            }
            invariant_forward_transition(operation.status, OperationStatus::Completed)?;

            let from = operation.status;
            operation.status = OperationStatus::Completed;
            operation.updated_at = self.clock.now();
            operation.response = Some(data.clone());
            self.store.put_operation(&operation)?;
            (from, operation.originator)
        };

        self.emit(BridgeEvent::OperationStatusUpdated {
            chain_id: self.config.chain_id,
            operation_id: id,
            from,
            to: OperationStatus::Completed,
        })
        .await;

        let receiver = self.receivers.read().get(&originator).cloned();
        let receiver_notified = match receiver {
            Some(receiver) => match receiver.on_read_response(id, &data).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(op = %id.short(), error = %e, "[router] Read originator callback failed");
                    false
                }
            },
            None => {
                warn!(
                    op = %id.short(),
                    originator = %address_hex(&originator),
                    "[router] No receiver bound for read originator"
                );
                false
            }
        };

        info!(op = %id.short(), bytes = data.len(), receiver_notified, "[router] Read response delivered");
        self.emit(BridgeEvent::ReadResponseDelivered {
            chain_id: self.config.chain_id,
            operation_id: id,
            originator,
            receiver_notified,
        })
        .await;
        Ok(())
    }

    async fn notify_message_received(
        &self,
        caller: Address,
        delivery: InboundDelivery,
    ) -> Result<DeliveryOutcome, BridgeError> {
        if !self.is_valid_adapter(&caller) {
            return Err(BridgeError::UnknownAdapter(caller));
        }
        let id = delivery.operation_id;

        {
            let _guard = self.tx_lock.lock().await;
            if !self.store.mark_inbound(&id)? {
                warn!(op = %id.short(), "[router] Duplicate delivery rejected");
                return Err(BridgeError::DuplicateDelivery(id.0));
            }
        }

        let outcome = self.execute_inbound(&caller, &delivery).await;

        info!(
            op = %id.short(),
            source_chain = delivery.source_chain,
            recipient = %address_hex(&delivery.recipient),
            executed = outcome.is_executed(),
            "[router] Inbound operation processed"
        );
        self.emit(BridgeEvent::MessageReceived {
            chain_id: self.config.chain_id,
            operation_id: id,
            source_chain: delivery.source_chain,
            recipient: delivery.recipient,
            executed: outcome.is_executed(),
        })
        .await;
        Ok(outcome)
    }
}
