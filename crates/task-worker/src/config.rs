use std::sync::Arc;

use serde_json::Value;

use task_worker_core::RetrievalOverrides;

use crate::executor::Action;

/// Worker-level configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Worker name, used in logs and passed to actions through the context.
    /// Must be non-empty.
    pub name: String,

    /// Free-form settings exposed to every action through the context
    pub settings: Value,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        WorkerConfig {
            name: name.into(),
            settings: Value::Null,
        }
    }

    pub fn settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Per-queue registration configuration: the action to run plus optional
/// retrieval overrides and a poison-queue destination.
pub struct TaskConfig {
    pub(crate) action: Arc<dyn Action>,
    pub(crate) retrieval: RetrievalOverrides,
    pub(crate) poison_queue: Option<String>,
}

impl TaskConfig {
    pub fn new(action: Arc<dyn Action>) -> Self {
        TaskConfig {
            action,
            retrieval: RetrievalOverrides::default(),
            poison_queue: None,
        }
    }

    /// Override parts of the default retrieval policy for this queue.
    pub fn retrieval(mut self, overrides: RetrievalOverrides) -> Self {
        self.retrieval = overrides;
        self
    }

    /// Route messages that exhaust their retry budget to this queue instead
    /// of dropping them.
    pub fn poison_queue(mut self, queue: impl Into<String>) -> Self {
        self.poison_queue = Some(queue.into());
        self
    }
}
