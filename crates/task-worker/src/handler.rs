use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use task_worker_core::{
    Executor, HandlerState, PoisonedTask, QueueMessage, QueueService, Result, RetrievalPolicy,
    WorkerError,
};

use crate::events::EventBus;
use crate::load::LoadMonitor;

/// Everything the poll loop needs, shared between the handler facade and the
/// spawned loop task.
struct HandlerShared {
    queue: String,
    policy: RetrievalPolicy,
    poison_queue: Option<String>,
    client: Arc<dyn QueueService>,
    executor: Arc<dyn Executor>,
    gate: Arc<dyn LoadMonitor>,
    events: Arc<EventBus>,
    state: watch::Sender<HandlerState>,
}

/// Adaptive poll scheduler for a single queue.
///
/// Owns the backoff timer, the retry-count policy and poison routing for its
/// queue. Handlers for different queues run fully independently; the only
/// state they share is the load gate's lag sample.
pub struct TaskHandler {
    shared: Arc<HandlerShared>,
}

impl TaskHandler {
    pub(crate) fn new(
        queue: String,
        policy: RetrievalPolicy,
        poison_queue: Option<String>,
        client: Arc<dyn QueueService>,
        executor: Arc<dyn Executor>,
        gate: Arc<dyn LoadMonitor>,
        events: Arc<EventBus>,
    ) -> Self {
        let (state, _) = watch::channel(HandlerState::Stopped);
        TaskHandler {
            shared: Arc::new(HandlerShared {
                queue,
                policy,
                poison_queue,
                client,
                executor,
                gate,
                events,
                state,
            }),
        }
    }

    pub fn queue(&self) -> &str {
        &self.shared.queue
    }

    pub fn state(&self) -> HandlerState {
        *self.shared.state.borrow()
    }

    /// Start polling. The first poll is issued immediately, bypassing
    /// backoff, and the interval is reset to the floor.
    ///
    /// Fails with `InvalidState` unless the handler is currently stopped.
    pub fn start(&self) -> Result<()> {
        let started = self.shared.state.send_if_modified(|state| {
            if *state == HandlerState::Stopped {
                *state = HandlerState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(WorkerError::InvalidState {
                queue: self.shared.queue.clone(),
                op: "start",
                state: self.state(),
            });
        }

        info!(queue = %self.shared.queue, "task handler started");
        tokio::spawn(poll_loop(Arc::clone(&self.shared)));
        Ok(())
    }

    /// Request a stop and wait for the poll loop to wind down.
    ///
    /// The loop transitions itself to `Stopped` the next time it observes the
    /// request, after draining any in-flight message processing. If that does
    /// not happen within two backoff-ceiling intervals the wait fails with
    /// `ShutdownTimeout`; the request itself stays in effect.
    ///
    /// Fails with `InvalidState` unless the handler is currently running.
    pub async fn stop(&self) -> Result<()> {
        let requested = self.shared.state.send_if_modified(|state| {
            if *state == HandlerState::Running {
                *state = HandlerState::Stopping;
                true
            } else {
                false
            }
        });
        if !requested {
            return Err(WorkerError::InvalidState {
                queue: self.shared.queue.clone(),
                op: "stop",
                state: self.state(),
            });
        }

        let timeout = 2 * self.shared.policy.max_interval;
        let mut observer = self.shared.state.subscribe();
        let stopped = tokio::time::timeout(
            timeout,
            observer.wait_for(|state| *state == HandlerState::Stopped),
        )
        .await;

        match stopped {
            Ok(_) => {
                info!(queue = %self.shared.queue, "task handler stopped");
                Ok(())
            }
            Err(_) => Err(WorkerError::ShutdownTimeout {
                queue: self.shared.queue.clone(),
                timeout,
            }),
        }
    }
}

/// One running poll loop. Exactly one of these is alive per handler while it
/// is running; the state check at the top of each cycle is how `Stopping`
/// becomes `Stopped`.
async fn poll_loop(shared: Arc<HandlerShared>) {
    let mut observer = shared.state.subscribe();
    let mut interval = shared.policy.min_interval;
    let mut inflight: JoinSet<()> = JoinSet::new();

    loop {
        if *observer.borrow_and_update() != HandlerState::Running {
            break;
        }

        let delay = match shared.client.receive_message(&shared.queue).await {
            Err(cause) => {
                shared.events.error(&WorkerError::Retrieval {
                    queue: shared.queue.clone(),
                    cause,
                });
                backoff(&shared.policy, &mut interval)
            }
            Ok(None) => {
                debug!(queue = %shared.queue, "queue empty");
                backoff(&shared.policy, &mut interval)
            }
            Ok(Some(message)) => {
                // Arm the next poll before the message is handled, so its
                // execution and the next retrieval can interleave without two
                // poll cycles ever being in flight at once.
                let delay = if shared.gate.is_overloaded() {
                    debug!(queue = %shared.queue, "overloaded, shedding immediate poll");
                    backoff(&shared.policy, &mut interval)
                } else {
                    interval = shared.policy.min_interval;
                    interval
                };
                inflight.spawn(handle_message(Arc::clone(&shared), message));
                delay
            }
        };

        wait_for_next_poll(delay, &mut observer, &mut inflight).await;
    }

    // Drain in-flight executor calls before publishing the terminal state.
    while inflight.join_next().await.is_some() {}
    shared.state.send_replace(HandlerState::Stopped);
    debug!(queue = %shared.queue, "poll loop exited");
}

/// Double-and-clamp, returning the delay before the next poll. After N
/// consecutive empty polls this yields `min(min_interval * 2^N, max_interval)`.
fn backoff(policy: &RetrievalPolicy, interval: &mut Duration) -> Duration {
    *interval = (*interval * 2).min(policy.max_interval);
    *interval
}

/// Sleep until the next poll is due, reaping finished message work and waking
/// early on a stop request.
async fn wait_for_next_poll(
    delay: Duration,
    observer: &mut watch::Receiver<HandlerState>,
    inflight: &mut JoinSet<()>,
) {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => break,
            changed = observer.changed() => {
                if changed.is_err() || *observer.borrow() != HandlerState::Running {
                    break;
                }
            }
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }
}

/// Handle one delivered message: poison-route it if its delivery budget is
/// exhausted, otherwise execute it and acknowledge on success. Every failure
/// here is reported and recovered; the poll loop never sees it.
async fn handle_message(shared: Arc<HandlerShared>, message: QueueMessage) {
    if message.received > shared.policy.max_retries {
        quarantine(&shared, &message).await;
        return;
    }

    debug!(
        queue = %shared.queue,
        id = %message.id,
        received = message.received,
        "executing task"
    );

    match shared.executor.execute(message.payload.clone()).await {
        Ok(()) => {
            if let Err(cause) = shared.client.delete_message(&message).await {
                shared.events.error(&WorkerError::Deletion {
                    queue: shared.queue.clone(),
                    cause,
                });
            }
        }
        Err(cause) => {
            // The message stays in the source queue; the transport advances
            // its delivery count on the next retrieval.
            shared.events.error(&WorkerError::Processing {
                queue: shared.queue.clone(),
                cause,
            });
        }
    }
}

/// Route a message that exhausted its retry budget to the poison queue (when
/// one is configured) and acknowledge it. The executor is never invoked, and
/// a failed poison send does not hold up the deletion.
async fn quarantine(shared: &HandlerShared, message: &QueueMessage) {
    warn!(
        queue = %shared.queue,
        id = %message.id,
        received = message.received,
        "retry budget exhausted"
    );

    if let Some(poison_queue) = &shared.poison_queue {
        let envelope = PoisonedTask::from_message(message).into_payload();
        if let Err(cause) = shared.client.send_message(poison_queue, envelope).await {
            shared.events.error(&WorkerError::PoisonRouting {
                queue: shared.queue.clone(),
                poison_queue: poison_queue.clone(),
                cause,
            });
        }
    }

    if let Err(cause) = shared.client.delete_message(message).await {
        shared.events.error(&WorkerError::Deletion {
            queue: shared.queue.clone(),
            cause,
        });
    }
}
