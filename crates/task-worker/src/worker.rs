use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::info;

use task_worker_core::{QueueService, Result, RetrievalPolicy, WorkerError};

use crate::config::{TaskConfig, WorkerConfig};
use crate::events::EventBus;
use crate::executor::{BoundExecutor, WorkerContext};
use crate::handler::TaskHandler;
use crate::load::LoadMonitor;

/// Orchestrates one [`TaskHandler`] per registered queue and the shared
/// context their executors run against.
pub struct Worker {
    name: String,
    client: Arc<dyn QueueService>,
    gate: Arc<dyn LoadMonitor>,
    context: Arc<WorkerContext>,
    events: Arc<EventBus>,
    handlers: HashMap<String, TaskHandler>,
}

impl Worker {
    /// Build a worker around a queue transport and a load gate handle.
    ///
    /// The gate's lag-threshold notifications are wired into the worker's
    /// `lag` channel here.
    pub fn new(
        config: WorkerConfig,
        client: Arc<dyn QueueService>,
        gate: Arc<dyn LoadMonitor>,
    ) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(WorkerError::Validation(
                "worker name must be a non-empty string".to_string(),
            ));
        }

        let events = Arc::new(EventBus::new());
        let lag_events = Arc::clone(&events);
        gate.on_lag_exceeded(Box::new(move |lag| lag_events.lag(lag)));

        let context = Arc::new(WorkerContext {
            name: config.name.clone(),
            settings: config.settings,
        });

        Ok(Worker {
            name: config.name,
            client,
            gate,
            context,
            events,
            handlers: HashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to operational errors (retrieval, processing, deletion,
    /// poison routing). Fire-and-forget; silence is the default when no
    /// listener is attached.
    pub fn on_error(&self, callback: impl Fn(&WorkerError) + Send + Sync + 'static) {
        self.events.on_error(callback);
    }

    /// Subscribe to load-gate lag notifications.
    pub fn on_lag(&self, callback: impl Fn(Duration) + Send + Sync + 'static) {
        self.events.on_lag(callback);
    }

    /// Register a handler for `queue`, merging the supplied retrieval
    /// overrides over the process-wide defaults and binding the action to the
    /// shared context.
    ///
    /// Fails with `Validation` if the queue name is empty or already
    /// registered, or if the merged policy is invalid.
    pub fn register(&mut self, queue: impl Into<String>, config: TaskConfig) -> Result<()> {
        let queue = queue.into();
        if queue.trim().is_empty() {
            return Err(WorkerError::Validation(
                "queue name must be a non-empty string".to_string(),
            ));
        }
        if self.handlers.contains_key(&queue) {
            return Err(WorkerError::Validation(format!(
                "queue '{queue}' is already registered"
            )));
        }

        let policy = RetrievalPolicy::default().merge(config.retrieval);
        policy.validate()?;

        let executor = Arc::new(BoundExecutor::new(
            Arc::clone(&self.context),
            config.action,
        ));
        let handler = TaskHandler::new(
            queue.clone(),
            policy,
            config.poison_queue,
            Arc::clone(&self.client),
            executor,
            Arc::clone(&self.gate),
            Arc::clone(&self.events),
        );

        self.handlers.insert(queue, handler);
        Ok(())
    }

    /// Start every registered handler.
    ///
    /// There is no collective guard: each handler enforces its own lifecycle,
    /// and the first `InvalidState` is returned after every handler has been
    /// attempted.
    pub fn start(&self) -> Result<()> {
        let mut first_failure = None;
        for handler in self.handlers.values() {
            if let Err(err) = handler.start() {
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            None => {
                info!(name = %self.name, "worker started");
                Ok(())
            }
            Some(err) => Err(err),
        }
    }

    /// Stop every handler concurrently and wait for all of them to settle.
    ///
    /// If any stop fails (timeout or invalid state) the overall result fails
    /// with the first such failure; handlers that stopped stay stopped.
    pub async fn stop(&self) -> Result<()> {
        let results = join_all(self.handlers.values().map(|handler| handler.stop())).await;
        for result in results {
            result?;
        }
        info!(name = %self.name, "worker stopped");
        Ok(())
    }

    /// Look up the handler registered for `queue`.
    pub fn handler(&self, queue: &str) -> Option<&TaskHandler> {
        self.handlers.get(queue)
    }
}
