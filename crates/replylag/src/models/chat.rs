use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type ConversationId = i64;
pub type SenderId = i64;

/// Sender id reserved for the client side of a conversation.
pub const CLIENT_SENDER_ID: SenderId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub created_at: i64,
}

impl Message {
    #[must_use]
    pub const fn is_from_client(&self) -> bool {
        self.sender_id == CLIENT_SENDER_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedingMessage {
    pub sender_id: SenderId,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedMessage {
    pub message: Message,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preceding: Option<PrecedingMessage>,
}

/// A manager message that answers someone else's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReply {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub preceding_sender_id: SenderId,
    pub preceding_at: i64,
    pub replied_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedReply {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub preceding_at: i64,
    pub replied_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyRecord {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManagerAverage {
    pub manager_id: SenderId,
    pub avg_minutes: f64,
    pub reply_count: usize,
}

/// JSONL import shape for a single message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MessageRecord {
    pub conversation_id: ConversationId,
    pub sender_id: SenderId,
    pub created_at: RawTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn to_unix_seconds(&self) -> anyhow::Result<i64> {
        match self {
            Self::Epoch(value) => crate::utils::time::epoch_to_unix_seconds(i128::from(*value)),
            Self::Text(value) => crate::utils::time::parse_timestamp_to_unix_seconds(value),
        }
    }
}

impl MessageRecord {
    pub fn into_message(self) -> anyhow::Result<Message> {
        Ok(Message {
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            created_at: self.created_at.to_unix_seconds()?,
        })
    }
}
