use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use task_worker_core::{Result, WorkerError};

/// Callback invoked when the lag estimate crosses the configured threshold.
pub type LagCallback = Box<dyn Fn(Duration) + Send + Sync>;

/// Read side of the load gate, consulted by every handler before it issues
/// an eager next poll.
///
/// This is the seam between the scheduler and the sampler: production code
/// uses [`LoadGate`], tests can pin the answer.
pub trait LoadMonitor: Send + Sync {
    /// Is the process currently overloaded?
    fn is_overloaded(&self) -> bool;

    /// Register a callback fired whenever a sample pushes the smoothed lag
    /// estimate above the threshold.
    fn on_lag_exceeded(&self, callback: LagCallback);
}

/// Process-wide load gate configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoadGateConfig {
    /// Delay between lag samples
    pub interval: Duration,

    /// Acceptable scheduler lag; a smoothed estimate above this counts as
    /// overload
    pub max_lag: Duration,
}

impl Default for LoadGateConfig {
    fn default() -> Self {
        LoadGateConfig {
            interval: Duration::from_millis(500),
            max_lag: Duration::from_millis(70),
        }
    }
}

struct GateShared {
    max_lag: Duration,
    lag_ms: AtomicU64,
    listeners: RwLock<Vec<LagCallback>>,
}

/// Samples scheduler lag in the background for the life of the gate and
/// answers the one question handlers ask: is it safe to poll again right now?
///
/// Configured once at process setup and shared by handle; there is no public
/// teardown. The sampler task is aborted only when the gate itself is
/// dropped.
pub struct LoadGate {
    shared: Arc<GateShared>,
    sampler: JoinHandle<()>,
}

impl LoadGate {
    /// Initialize the gate and spawn its background sampler.
    ///
    /// Both `interval` and `max_lag` must be greater than zero.
    pub fn configure(config: LoadGateConfig) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(WorkerError::Validation(
                "load gate interval must be greater than zero".to_string(),
            ));
        }
        if config.max_lag.is_zero() {
            return Err(WorkerError::Validation(
                "load gate max lag must be greater than zero".to_string(),
            ));
        }

        let shared = Arc::new(GateShared {
            max_lag: config.max_lag,
            lag_ms: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
        });
        let sampler = tokio::spawn(sample_lag(Arc::clone(&shared), config.interval));

        Ok(LoadGate { shared, sampler })
    }

    /// Current smoothed lag estimate.
    pub fn current_lag(&self) -> Duration {
        Duration::from_millis(self.shared.lag_ms.load(Ordering::Relaxed))
    }
}

impl LoadMonitor for LoadGate {
    fn is_overloaded(&self) -> bool {
        self.shared.lag_ms.load(Ordering::Relaxed) > self.shared.max_lag.as_millis() as u64
    }

    fn on_lag_exceeded(&self, callback: LagCallback) {
        self.shared.listeners.write().push(callback);
    }
}

impl Drop for LoadGate {
    fn drop(&mut self) {
        self.sampler.abort();
    }
}

async fn sample_lag(shared: Arc<GateShared>, interval: Duration) {
    let max_lag_ms = shared.max_lag.as_millis() as u64;
    let mut deadline = Instant::now() + interval;

    loop {
        tokio::time::sleep_until(deadline).await;
        let late = Instant::now().saturating_duration_since(deadline);

        // Exponential smoothing, factor 1/3: a single heavy sample decays
        // over a few intervals instead of flapping the gate.
        let previous = shared.lag_ms.load(Ordering::Relaxed);
        let smoothed = (previous * 2 + late.as_millis() as u64) / 3;
        shared.lag_ms.store(smoothed, Ordering::Relaxed);

        if smoothed > max_lag_ms {
            let lag = Duration::from_millis(smoothed);
            warn!(lag_ms = smoothed, "scheduler lag above threshold");
            for listener in shared.listeners.read().iter() {
                listener(lag);
            }
        } else if !late.is_zero() {
            debug!(lag_ms = smoothed, "scheduler lag sampled");
        }

        deadline += interval;
    }
}
