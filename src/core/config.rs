//! Runtime configuration for a console.

use std::time::Duration;

use super::DEFAULT_SCROLLBACK;

/// Rows kept at the bottom of the terminal: the separator and the input line.
pub const RESERVED_ROWS: u16 = 2;

/// Default number of messages that may wait for the render thread.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Configuration for a [`ConsoleService`](super::ConsoleService).
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// How long the render thread sleeps between queue drains.
    pub tick_interval: Duration,
    /// How long the input thread waits for a key before re-checking for shutdown.
    pub input_poll_interval: Duration,
    /// Number of rendered messages kept for repainting.
    pub scrollback_capacity: usize,
    /// Maximum number of messages waiting to be rendered.
    pub queue_capacity: usize,
    /// Character the separator row is drawn with.
    pub separator: char,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            input_poll_interval: Duration::from_millis(50),
            scrollback_capacity: DEFAULT_SCROLLBACK,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            separator: '-',
        }
    }
}
