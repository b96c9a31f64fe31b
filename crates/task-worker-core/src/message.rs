use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A unit of work retrieved from a queue.
///
/// Messages are created by the queue transport on send. The transport owns
/// the `received` delivery counter and advances it on every delivery; the
/// runtime only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Opaque identifier, unique within the backing queue
    pub id: String,

    /// Name of the queue this message was received from
    pub queue: String,

    /// Arbitrary structured payload, forwarded to the executor untouched
    pub payload: Value,

    /// How many times this message has been delivered (`>= 1` once received)
    pub received: u32,

    /// When the message was sent (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_on: Option<DateTime<Utc>>,

    /// When the message expires (informational only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
}

/// Envelope sent to a poison queue when a message exhausts its retry budget.
///
/// The payload is carried verbatim; `source_queue` tags where the message
/// came from so poisoned work can be inspected offline instead of being
/// silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoisonedTask {
    pub source_queue: String,
    pub message_id: String,
    pub received: u32,
    pub payload: Value,
}

impl PoisonedTask {
    pub fn from_message(message: &QueueMessage) -> Self {
        PoisonedTask {
            source_queue: message.queue.clone(),
            message_id: message.id.clone(),
            received: message.received,
            payload: message.payload.clone(),
        }
    }

    /// Serialize into the payload handed to `QueueService::send_message`.
    pub fn into_payload(self) -> Value {
        serde_json::json!({
            "source_queue": self.source_queue,
            "message_id": self.message_id,
            "received": self.received,
            "payload": self.payload,
        })
    }
}
