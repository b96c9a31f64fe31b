mod error;
mod message;
mod policy;
mod service;
mod state;

pub use error::{Result, WorkerError};
pub use message::{PoisonedTask, QueueMessage};
pub use policy::{RetrievalOverrides, RetrievalPolicy};
pub use service::{Executor, QueueService};
pub use state::HandlerState;
