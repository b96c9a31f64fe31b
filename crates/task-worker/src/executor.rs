use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use task_worker_core::Executor;

/// Shared state handed to every action invocation.
///
/// The worker builds one context at construction and binds every registered
/// action to it; actions needing richer collaborators (database handles,
/// clients) capture them in their own state.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Name of the owning worker
    pub name: String,

    /// Free-form settings shared by all actions
    pub settings: Value,
}

/// Business logic for one queue.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(&self, ctx: &WorkerContext, payload: Value) -> anyhow::Result<()>;
}

/// An [`Action`] bound to the worker's shared context.
///
/// Built at registration time so the scheduler only ever sees the opaque
/// [`Executor`] surface.
pub struct BoundExecutor {
    context: Arc<WorkerContext>,
    action: Arc<dyn Action>,
}

impl BoundExecutor {
    pub fn new(context: Arc<WorkerContext>, action: Arc<dyn Action>) -> Self {
        BoundExecutor { context, action }
    }
}

#[async_trait]
impl Executor for BoundExecutor {
    async fn execute(&self, payload: Value) -> anyhow::Result<()> {
        self.action.run(&self.context, payload).await
    }
}
