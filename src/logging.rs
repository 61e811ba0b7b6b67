//! Forward host [`tracing`] events into the console.
//!
//! Add a [`ConsoleLayer`] to the host's subscriber and every event with a
//! message becomes a console line. Events emitted by this crate are skipped,
//! since rendering them would log again.
//!
//! ```
//! use tracing_subscriber::prelude::*;
//! use console_writer::testing::memory_terminal;
//! use console_writer::{ConsoleConfig, ConsoleLayer, ConsoleService};
//!
//! let (terminal, _surface, _keys) = memory_terminal(80, 24);
//! let console = ConsoleService::create(ConsoleConfig::default(), terminal).unwrap();
//! let subscriber = tracing_subscriber::registry()
//!     .with(ConsoleLayer::new(console.handle().clone()));
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!("shows up above the input line");
//! });
//!
//! console.shutdown();
//! while !console.is_deletable() {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! let lines: Vec<String> = console.scrollback().iter().map(|m| m.body()).collect();
//! assert_eq!(lines, ["shows up above the input line", "Console shut down."]);
//! ```

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::core::{ConsoleHandle, Message};

/// Events whose target starts with this are never forwarded.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// A [`Layer`] that queues log events as console messages.
///
/// `ERROR` and `WARN` events become error lines; everything else is a
/// plain timestamped line. Events above `max_level` are dropped.
#[derive(Debug, Clone)]
pub struct ConsoleLayer {
    handle: ConsoleHandle,
    max_level: Level,
}

impl ConsoleLayer {
    /// Forward `INFO` and more severe events to `handle`.
    pub fn new(handle: ConsoleHandle) -> Self {
        Self {
            handle,
            max_level: Level::INFO,
        }
    }

    /// Forward events up to and including `level` (e.g. `Level::DEBUG`).
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > self.max_level || metadata.target().starts_with(OWN_TARGET) {
            return;
        }

        let mut text = None;
        event.record(&mut MessageVisitor(&mut text));
        let Some(text) = text else {
            return;
        };

        let message = if level <= Level::WARN {
            Message::error(text)
        } else {
            Message::timestamped(text)
        };
        // Nowhere to report a full or closed queue without recursing.
        let _ = self.handle.add_message(message);
    }
}

/// Records the `message` field of an event.
struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // Only log out messages
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn capture(layer: ConsoleLayer, emit: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
    }

    #[test]
    fn test_forwards_levels() {
        let handle = ConsoleHandle::detached();
        capture(ConsoleLayer::new(handle.clone()), || {
            tracing::info!(target: "host", "loaded {} assets", 3);
            tracing::warn!(target: "host", "low disk");
            tracing::debug!(target: "host", "too chatty");
        });

        let queued = handle.take_queued();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].body(), "loaded 3 assets");
        assert!(!queued[0].is_error());
        assert_eq!(queued[1].body(), "[ERROR] low disk");
        assert!(queued[1].is_error());
    }

    #[test]
    fn test_max_level() {
        let handle = ConsoleHandle::detached();
        capture(
            ConsoleLayer::new(handle.clone()).with_max_level(Level::DEBUG),
            || tracing::debug!(target: "host", "now visible"),
        );
        assert_eq!(handle.take_queued().len(), 1);
    }

    #[test]
    fn test_skips_own_events() {
        let handle = ConsoleHandle::detached();
        capture(ConsoleLayer::new(handle.clone()), || {
            tracing::info!(target: "console_writer::core::pump", "render loop started");
            tracing::info!(target: "host", field = 1);
        });
        // The second event has no message field.
        assert!(handle.take_queued().is_empty());
    }
}
