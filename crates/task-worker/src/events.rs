use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use task_worker_core::WorkerError;

pub type ErrorCallback = Box<dyn Fn(&WorkerError) + Send + Sync>;
pub type LagCallback = Box<dyn Fn(Duration) + Send + Sync>;

/// Fan-out for the worker's two observable channels, `error` and `lag`.
///
/// Callbacks run synchronously in registration order. A panicking callback
/// is caught and logged so the remaining callbacks still run and handler
/// state is never corrupted. Both channels are fire-and-forget: no behavior
/// depends on whether anyone is listening.
#[derive(Default)]
pub struct EventBus {
    error_listeners: RwLock<Vec<ErrorCallback>>,
    lag_listeners: RwLock<Vec<LagCallback>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn on_error(&self, callback: impl Fn(&WorkerError) + Send + Sync + 'static) {
        self.error_listeners.write().push(Box::new(callback));
    }

    pub fn on_lag(&self, callback: impl Fn(Duration) + Send + Sync + 'static) {
        self.lag_listeners.write().push(Box::new(callback));
    }

    /// Report an operational error.
    pub fn error(&self, err: &WorkerError) {
        warn!(%err, "worker error");
        for listener in self.error_listeners.read().iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(err))).is_err() {
                error!("error listener panicked");
            }
        }
    }

    /// Report scheduler lag above the configured threshold.
    pub fn lag(&self, lag: Duration) {
        debug!(?lag, "lag event");
        for listener in self.lag_listeners.read().iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(lag))).is_err() {
                error!("lag listener panicked");
            }
        }
    }
}
