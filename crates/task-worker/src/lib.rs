//! Queue-consumer runtime.
//!
//! A [`Worker`] owns one [`TaskHandler`] per registered queue. Each handler
//! drives its own poll -> execute -> delete cycle against an opaque
//! [`QueueService`], racing ahead while messages keep arriving and backing
//! off exponentially while the queue is empty. A process-wide [`LoadGate`]
//! throttles eager polling when the scheduler itself is lagging, and
//! messages that exhaust their delivery budget are routed to a poison queue
//! instead of being retried forever.

pub mod config;
pub mod events;
pub mod executor;
pub mod handler;
pub mod load;
pub mod worker;

pub use config::{TaskConfig, WorkerConfig};
pub use executor::{Action, WorkerContext};
pub use handler::TaskHandler;
pub use load::{LoadGate, LoadGateConfig, LoadMonitor};
pub use worker::Worker;

pub use task_worker_core::{
    Executor, HandlerState, PoisonedTask, QueueMessage, QueueService, Result, RetrievalOverrides,
    RetrievalPolicy, WorkerError,
};
