//! # Inbound Delivery Handling
//!
//! Transport-independent processing of decoded bridge messages, shared by
//! every adapter once its transport-level checks (caller, peer, replay)
//! have passed.
//!
//! ```text
//! destination side                          source side
//! ─────────────────                         ───────────
//! Transfer / Message / Compose
//!   ├─ notify_message_received (duplicate: stop, no receipts)
//!   ├─ Receipt(Delivered) ───────────────→  update_operation_status
//!   └─ Receipt(Completed | Failed) ──────→  update_operation_status
//! ReadRequest
//!   └─ StateReader::read
//!      └─ ReadResponse ──────────────────→  deliver_read_response | Failed
//! ```
//!
//! Receipts can arrive in any order. One that is no longer a forward move
//! is stale and dropped.

use super::codec::{
    BridgeMessage, ComposeBody, MessageBody, ReadRequestBody, ReadResponseBody, ReceiptBody,
    TransferBody,
};
use crate::domain::{
    Address, BridgeError, ChainId, DeliveryOutcome, InboundDelivery, InboundPayload, OperationId,
    OperationStatus,
};
use crate::ports::inbound::RouterGateway;
use crate::ports::outbound::StateReader;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Return path to the chain a message came from.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    /// Send `message` back to `dest_chain`.
    async fn reply(&self, dest_chain: ChainId, message: BridgeMessage) -> Result<(), BridgeError>;
}

/// Applies decoded messages to the local router.
pub struct DeliveryHandler {
    adapter: Address,
    component: &'static str,
    router: Weak<dyn RouterGateway>,
    state_reader: Option<Arc<dyn StateReader>>,
}

impl DeliveryHandler {
    /// Handler acting as `adapter` towards `router`.
    pub fn new(adapter: Address, component: &'static str, router: Weak<dyn RouterGateway>) -> Self {
        Self {
            adapter,
            component,
            router,
            state_reader: None,
        }
    }

    /// Serve read requests from `reader`.
    pub fn with_state_reader(mut self, reader: Arc<dyn StateReader>) -> Self {
        self.state_reader = Some(reader);
        self
    }

    fn router(&self) -> Result<Arc<dyn RouterGateway>, BridgeError> {
        self.router.upgrade().ok_or(BridgeError::RouterUnavailable)
    }

    /// Process one message from `source_chain`.
    ///
    /// Only a duplicate delivery or a source-side callback failure other
    /// than a stale receipt is returned as an error.
    pub async fn handle(
        &self,
        source_chain: ChainId,
        message: BridgeMessage,
        reply: &dyn ReplyChannel,
    ) -> Result<(), BridgeError> {
        match message {
            BridgeMessage::Transfer(body) => {
                check_source(source_chain, body.source_chain)?;
                let delivery = transfer_delivery(body);
                self.execute(source_chain, delivery, reply).await
            }
            BridgeMessage::Message(body) => {
                check_source(source_chain, body.source_chain)?;
                let delivery = message_delivery(body);
                self.execute(source_chain, delivery, reply).await
            }
            BridgeMessage::Compose(body) => {
                check_source(source_chain, body.source_chain)?;
                let delivery = compose_delivery(body);
                self.execute(source_chain, delivery, reply).await
            }
            BridgeMessage::ReadRequest(body) => {
                check_source(source_chain, body.source_chain)?;
                self.serve_read(source_chain, body, reply).await;
                Ok(())
            }
            BridgeMessage::ReadResponse(body) => self.apply_read_response(body).await,
            BridgeMessage::Receipt(body) => self.apply_receipt(body).await,
        }
    }

    async fn execute(
        &self,
        source_chain: ChainId,
        delivery: InboundDelivery,
        reply: &dyn ReplyChannel,
    ) -> Result<(), BridgeError> {
        let operation_id = delivery.operation_id;
        let router = self.router()?;
        let result = router.notify_message_received(self.adapter, delivery).await;
        if let Err(e @ BridgeError::DuplicateDelivery(_)) = result {
            return Err(e);
        }

        self.send_receipt(reply, source_chain, operation_id, OperationStatus::Delivered)
            .await;
        let final_status = match result {
            Ok(DeliveryOutcome::Executed) => OperationStatus::Completed,
            Ok(DeliveryOutcome::Rejected(reason)) => {
                warn!(
                    op = %operation_id.short(),
                    reason = %reason,
                    "[{}] Delivery rejected by recipient",
                    self.component
                );
                OperationStatus::Failed
            }
            Err(e) => {
                warn!(
                    op = %operation_id.short(),
                    error = %e,
                    "[{}] Delivery failed",
                    self.component
                );
                OperationStatus::Failed
            }
        };

        self.send_receipt(reply, source_chain, operation_id, final_status)
            .await;
        Ok(())
    }

    async fn serve_read(&self, source_chain: ChainId, body: ReadRequestBody, reply: &dyn ReplyChannel) {
        let result = match &self.state_reader {
            Some(reader) => reader.read(&body.target, body.selector, &body.call_data).await,
            None => Err(BridgeError::OperationNotSupported(
                "no state reader configured".into(),
            )),
        };

        let response = match result {
            Ok(data) => ReadResponseBody {
                operation_id: body.operation_id,
                success: true,
                data,
            },
            Err(e) => {
                warn!(
                    op = %body.operation_id.short(),
                    error = %e,
                    "[{}] State read failed",
                    self.component
                );
                ReadResponseBody {
                    operation_id: body.operation_id,
                    success: false,
                    data: e.to_string().into_bytes(),
                }
            }
        };

        if let Err(e) = reply
            .reply(source_chain, BridgeMessage::ReadResponse(response))
            .await
        {
            warn!(error = %e, "[{}] Failed to send read response", self.component);
        }
    }

    async fn apply_read_response(&self, body: ReadResponseBody) -> Result<(), BridgeError> {
        let router = self.router()?;
        let result = if body.success {
            router
                .deliver_read_response(self.adapter, body.operation_id, body.data)
                .await
        } else {
            router
                .update_operation_status(self.adapter, body.operation_id, OperationStatus::Failed)
                .await
        };
        self.drop_stale(body.operation_id, result)
    }

    async fn apply_receipt(&self, body: ReceiptBody) -> Result<(), BridgeError> {
        let router = self.router()?;
        let result = router
            .update_operation_status(self.adapter, body.operation_id, body.status)
            .await;
        self.drop_stale(body.operation_id, result)
    }

    fn drop_stale(
        &self,
        operation_id: OperationId,
        result: Result<(), BridgeError>,
    ) -> Result<(), BridgeError> {
        match result {
            Err(BridgeError::InvalidStatusTransition { from, to }) => {
                debug!(
                    op = %operation_id.short(),
                    %from,
                    %to,
                    "[{}] Stale receipt dropped",
                    self.component
                );
                Ok(())
            }
            other => other,
        }
    }

    async fn send_receipt(
        &self,
        reply: &dyn ReplyChannel,
        dest_chain: ChainId,
        operation_id: OperationId,
        status: OperationStatus,
    ) {
        let receipt = BridgeMessage::Receipt(ReceiptBody {
            operation_id,
            status,
        });
        match reply.reply(dest_chain, receipt).await {
            Ok(()) => info!(
                op = %operation_id.short(),
                %status,
                "[{}] Receipt sent",
                self.component
            ),
            Err(e) => warn!(
                op = %operation_id.short(),
                error = %e,
                "[{}] Failed to send receipt",
                self.component
            ),
        }
    }
}

fn check_source(transport_source: ChainId, claimed: ChainId) -> Result<(), BridgeError> {
    if transport_source != claimed {
        return Err(BridgeError::InvalidPayload(format!(
            "message claims source chain {claimed}, transport says {transport_source}"
        )));
    }
    Ok(())
}

fn transfer_delivery(body: TransferBody) -> InboundDelivery {
    InboundDelivery {
        operation_id: body.operation_id,
        source_chain: body.source_chain,
        originator: body.originator,
        recipient: body.recipient,
        payload: InboundPayload::Transfer {
            asset: body.asset,
            amount: body.amount,
        },
    }
}

fn message_delivery(body: MessageBody) -> InboundDelivery {
    InboundDelivery {
        operation_id: body.operation_id,
        source_chain: body.source_chain,
        originator: body.originator,
        recipient: body.recipient,
        payload: InboundPayload::Message(body.payload),
    }
}

fn compose_delivery(body: ComposeBody) -> InboundDelivery {
    // The sender of a bundle is also the receiver that executes it.
    InboundDelivery {
        operation_id: body.operation_id,
        source_chain: body.source_chain,
        originator: body.originator,
        recipient: body.originator,
        payload: InboundPayload::Compose(body.actions),
    }
}
