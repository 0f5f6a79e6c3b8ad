//! # Wire Codec
//!
//! Bridge messages travel as `[message-type tag: u8][bincode body]`.
//!
//! | Tag | Message | Direction |
//! |-----|---------|-----------|
//! | 1 | Transfer | source -> destination |
//! | 2 | ReadRequest | source -> destination |
//! | 3 | ReadResponse | destination -> source |
//! | 4 | Message | source -> destination |
//! | 5 | Compose | source -> destination |
//! | 6 | Receipt | destination -> source |

use crate::domain::{Address, BridgeError, ChainId, ComposeAction, OperationId, OperationStatus, U256};
use serde::{Deserialize, Serialize};

/// Transfer tag.
pub const TAG_TRANSFER: u8 = 1;
/// Read request tag.
pub const TAG_READ_REQUEST: u8 = 2;
/// Read response tag.
pub const TAG_READ_RESPONSE: u8 = 3;
/// Message tag.
pub const TAG_MESSAGE: u8 = 4;
/// Compose tag.
pub const TAG_COMPOSE: u8 = 5;
/// Receipt tag.
pub const TAG_RECEIPT: u8 = 6;

/// Every tag, for adapters that accept all of them.
pub const ALL_TAGS: &[u8] = &[
    TAG_TRANSFER,
    TAG_READ_REQUEST,
    TAG_READ_RESPONSE,
    TAG_MESSAGE,
    TAG_COMPOSE,
    TAG_RECEIPT,
];

/// Asset transfer body. `asset` is already the destination-side asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBody {
    pub operation_id: OperationId,
    pub source_chain: ChainId,
    pub originator: Address,
    pub recipient: Address,
    pub asset: Address,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequestBody {
    pub operation_id: OperationId,
    pub source_chain: ChainId,
    pub target: Address,
    pub selector: [u8; 4],
    pub call_data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponseBody {
    pub operation_id: OperationId,
    pub success: bool,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub operation_id: OperationId,
    pub source_chain: ChainId,
    pub originator: Address,
    pub recipient: Address,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeBody {
    pub operation_id: OperationId,
    pub source_chain: ChainId,
    pub originator: Address,
    pub actions: Vec<ComposeAction>,
}

/// Destination-side status report for a source-side operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptBody {
    pub operation_id: OperationId,
    pub status: OperationStatus,
}

/// A decoded bridge message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeMessage {
    Transfer(TransferBody),
    ReadRequest(ReadRequestBody),
    ReadResponse(ReadResponseBody),
    Message(MessageBody),
    Compose(ComposeBody),
    Receipt(ReceiptBody),
}

impl BridgeMessage {
    /// Wire tag.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::Transfer(_) => TAG_TRANSFER,
            Self::ReadRequest(_) => TAG_READ_REQUEST,
            Self::ReadResponse(_) => TAG_READ_RESPONSE,
            Self::Message(_) => TAG_MESSAGE,
            Self::Compose(_) => TAG_COMPOSE,
            Self::Receipt(_) => TAG_RECEIPT,
        }
    }

    /// Operation the message refers to.
    #[must_use]
    pub fn operation_id(&self) -> OperationId {
        match self {
            Self::Transfer(b) => b.operation_id,
            Self::ReadRequest(b) => b.operation_id,
            Self::ReadResponse(b) => b.operation_id,
            Self::Message(b) => b.operation_id,
            Self::Compose(b) => b.operation_id,
            Self::Receipt(b) => b.operation_id,
        }
    }
}

fn encode_body<T: Serialize>(tag: u8, body: &T) -> Result<Vec<u8>, BridgeError> {
    let mut out = vec![tag];
    let encoded =
        bincode::serialize(body).map_err(|e| BridgeError::InvalidPayload(e.to_string()))?;
    out.extend_from_slice(&encoded);
    Ok(out)
}

fn decode_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, BridgeError> {
    bincode::deserialize(body).map_err(|e| BridgeError::InvalidPayload(e.to_string()))
}

/// Encode a message.
pub fn encode(message: &BridgeMessage) -> Result<Vec<u8>, BridgeError> {
    match message {
        BridgeMessage::Transfer(b) => encode_body(TAG_TRANSFER, b),
        BridgeMessage::ReadRequest(b) => encode_body(TAG_READ_REQUEST, b),
        BridgeMessage::ReadResponse(b) => encode_body(TAG_READ_RESPONSE, b),
        BridgeMessage::Message(b) => encode_body(TAG_MESSAGE, b),
        BridgeMessage::Compose(b) => encode_body(TAG_COMPOSE, b),
        BridgeMessage::Receipt(b) => encode_body(TAG_RECEIPT, b),
    }
}

/// Decode a message.
pub fn decode(bytes: &[u8]) -> Result<BridgeMessage, BridgeError> {
    let (&tag, body) = bytes
        .split_first()
        .ok_or_else(|| BridgeError::InvalidPayload("empty message".into()))?;

    match tag {
        TAG_TRANSFER => decode_body(body).map(BridgeMessage::Transfer),
        TAG_READ_REQUEST => decode_body(body).map(BridgeMessage::ReadRequest),
        TAG_READ_RESPONSE => decode_body(body).map(BridgeMessage::ReadResponse),
        TAG_MESSAGE => decode_body(body).map(BridgeMessage::Message),
        TAG_COMPOSE => decode_body(body).map(BridgeMessage::Compose),
        TAG_RECEIPT => decode_body(body).map(BridgeMessage::Receipt),
        other => Err(BridgeError::UnsupportedMessageType(other)),
    }
}

/// Decode a message, rejecting tags outside `accepted`.
pub fn decode_accepted(bytes: &[u8], accepted: &[u8]) -> Result<BridgeMessage, BridgeError> {
    if let Some(&tag) = bytes.first() {
        if !accepted.contains(&tag) {
            return Err(BridgeError::UnsupportedMessageType(tag));
        }
    }
    decode(bytes)
}
