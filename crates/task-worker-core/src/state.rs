use std::fmt;

/// Lifecycle state of a single queue handler.
///
/// Transitions: `Stopped -> Running` (start), `Running -> Stopping` (stop
/// request), `Stopping -> Stopped` (the poll loop observing the request).
/// The state is only ever mutated by the handler that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerState {
    /// Initial and terminal state; no poll loop is active
    Stopped,
    /// The poll loop is active
    Running,
    /// A stop was requested; the poll loop has not yet wound down
    Stopping,
}

impl HandlerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerState::Stopped => "stopped",
            HandlerState::Running => "running",
            HandlerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
