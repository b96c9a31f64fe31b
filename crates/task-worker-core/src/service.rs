use async_trait::async_trait;
use serde_json::Value;

use crate::message::QueueMessage;

/// Queue transport consumed by the runtime.
///
/// The transport owns message persistence, visibility and the `received`
/// delivery counter. An empty queue is `Ok(None)`, never an error; a
/// delivered message always has `received >= 1`.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Put a payload on the named queue.
    async fn send_message(&self, queue: &str, payload: Value) -> anyhow::Result<()>;

    /// Retrieve at most one message from the named queue.
    async fn receive_message(&self, queue: &str) -> anyhow::Result<Option<QueueMessage>>;

    /// Acknowledge a message, removing it from its queue.
    async fn delete_message(&self, message: &QueueMessage) -> anyhow::Result<()>;
}

/// Executes one task payload.
///
/// Opaque to the scheduler: nothing beyond success or failure is inspected.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, payload: Value) -> anyhow::Result<()>;
}
