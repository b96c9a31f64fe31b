//! End-to-end run against an in-memory queue transport.
//!
//! Seeds a few email tasks (one of them unprocessable), consumes them with a
//! registered action and prints what ended up on the poison queue.
//!
//! ```sh
//! cargo run --example in_memory
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use task_worker::{
    Action, LoadGate, LoadGateConfig, QueueMessage, QueueService, TaskConfig, Worker, WorkerConfig,
    WorkerContext,
};

/// In-memory transport: an unacknowledged message goes back to the end of its
/// queue and is redelivered with a bumped delivery count.
#[derive(Default)]
struct InMemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<QueueMessage>>>,
}

impl InMemoryQueue {
    fn len(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map_or(0, |q| q.len())
    }
}

#[async_trait]
impl QueueService for InMemoryQueue {
    async fn send_message(&self, queue: &str, payload: Value) -> anyhow::Result<()> {
        let message = QueueMessage {
            id: Uuid::new_v4().to_string(),
            queue: queue.to_string(),
            payload,
            received: 0,
            sent_on: Some(Utc::now()),
            expires_on: None,
        };
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
        Ok(())
    }

    async fn receive_message(&self, queue: &str) -> anyhow::Result<Option<QueueMessage>> {
        let mut queues = self.queues.lock();
        let Some(messages) = queues.get_mut(queue) else {
            return Ok(None);
        };
        match messages.pop_front() {
            None => Ok(None),
            Some(mut message) => {
                message.received += 1;
                messages.push_back(message.clone());
                Ok(Some(message))
            }
        }
    }

    async fn delete_message(&self, message: &QueueMessage) -> anyhow::Result<()> {
        if let Some(messages) = self.queues.lock().get_mut(&message.queue) {
            messages.retain(|m| m.id != message.id);
        }
        Ok(())
    }
}

struct SendEmail;

#[async_trait]
impl Action for SendEmail {
    async fn run(&self, ctx: &WorkerContext, payload: Value) -> anyhow::Result<()> {
        let Some(to) = payload["to"].as_str() else {
            anyhow::bail!("missing recipient");
        };
        tracing::info!(worker = %ctx.name, to, "email sent");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let queue = Arc::new(InMemoryQueue::default());
    let gate = Arc::new(LoadGate::configure(LoadGateConfig::default())?);

    for i in 0..3 {
        queue
            .send_message("emails", json!({ "to": format!("user-{i}@example.com") }))
            .await?;
    }
    // This one can never succeed; after its retry budget it ends up on the
    // poison queue.
    queue
        .send_message("emails", json!({ "subject": "no recipient" }))
        .await?;

    let mut worker = Worker::new(
        WorkerConfig::new("demo-worker"),
        Arc::clone(&queue) as Arc<dyn QueueService>,
        gate,
    )?;
    worker.on_error(|err| tracing::warn!(%err, "reported"));
    worker.register(
        "emails",
        TaskConfig::new(Arc::new(SendEmail)).poison_queue("emails-dead"),
    )?;

    worker.start()?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    worker.stop().await?;

    tracing::info!(
        pending = queue.len("emails"),
        poisoned = queue.len("emails-dead"),
        "run finished"
    );
    Ok(())
}
