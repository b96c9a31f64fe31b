use std::time::Duration;

use thiserror::Error;

use crate::state::HandlerState;

/// Errors produced by the worker runtime.
///
/// `Validation`, `InvalidState` and `ShutdownTimeout` are returned directly
/// from the call that caused them. The four operational variants
/// (`Retrieval`, `Processing`, `Deletion`, `PoisonRouting`) wrap a
/// collaborator failure and are only ever reported through the worker's
/// error channel; they never stop a handler.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("{0}")]
    Validation(String),

    #[error("cannot {op} handler for '{queue}' queue while it is {state}")]
    InvalidState {
        queue: String,
        op: &'static str,
        state: HandlerState,
    },

    #[error("Failed to retrieve a task from '{queue}' queue: {cause}")]
    Retrieval { queue: String, cause: anyhow::Error },

    #[error("Failed to process a task from '{queue}' queue: {cause}")]
    Processing { queue: String, cause: anyhow::Error },

    #[error("Failed to delete a task from '{queue}' queue: {cause}")]
    Deletion { queue: String, cause: anyhow::Error },

    #[error("Failed to route a task from '{queue}' queue to poison queue '{poison_queue}': {cause}")]
    PoisonRouting {
        queue: String,
        poison_queue: String,
        cause: anyhow::Error,
    },

    #[error("handler for '{queue}' queue did not stop within {timeout:?}")]
    ShutdownTimeout { queue: String, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, WorkerError>;
