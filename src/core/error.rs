//! Error type for host-facing console calls.

/// Errors returned to the host when the console cannot accept a call.
///
/// Worker threads never surface errors; these only describe why a message or
/// command submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// The console has shut down (or is shutting down) and no longer accepts input.
    ShutDown,
    /// The message queue is at capacity.
    QueueFull {
        /// The configured queue capacity.
        capacity: usize,
    },
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::ShutDown => write!(f, "console already shut down"),
            ConsoleError::QueueFull { capacity } => {
                write!(f, "message queue full ({} pending)", capacity)
            }
        }
    }
}

impl std::error::Error for ConsoleError {}
