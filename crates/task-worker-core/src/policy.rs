use std::time::Duration;

use crate::error::{Result, WorkerError};

/// Per-queue retrieval configuration, immutable after handler construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalPolicy {
    /// Floor poll delay after any activity (a message found or just processed)
    pub min_interval: Duration,

    /// Ceiling poll delay reached after repeated empty polls
    pub max_interval: Duration,

    /// Maximum delivery count tolerated before a message is treated as poisoned
    pub max_retries: u32,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        RetrievalPolicy {
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(3000),
            max_retries: 3,
        }
    }
}

impl RetrievalPolicy {
    /// Apply caller-supplied overrides on top of this policy.
    pub fn merge(self, overrides: RetrievalOverrides) -> Self {
        RetrievalPolicy {
            min_interval: overrides.min_interval.unwrap_or(self.min_interval),
            max_interval: overrides.max_interval.unwrap_or(self.max_interval),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
        }
    }

    /// Check the `0 < min_interval <= max_interval` invariant.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval.is_zero() {
            return Err(WorkerError::Validation(
                "min interval must be greater than zero".to_string(),
            ));
        }
        if self.max_interval < self.min_interval {
            return Err(WorkerError::Validation(format!(
                "max interval ({:?}) must not be less than min interval ({:?})",
                self.max_interval, self.min_interval
            )));
        }
        Ok(())
    }
}

/// Caller-supplied overrides merged over the process-wide defaults at
/// registration time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalOverrides {
    pub min_interval: Option<Duration>,
    pub max_interval: Option<Duration>,
    pub max_retries: Option<u32>,
}
