//! An embeddable terminal console.
//!
//! console_writer splits the terminal into a scrolling message area and a
//! single input line underneath it:
//!
//! - **Messages**: Any thread queues styled lines; a render thread draws them in order
//! - **Commands**: Named handlers run when the user submits a line
//! - **Lifecycle**: Components observe each other's teardown instead of polling
//!
//! # Features
//!
//! - `terminal` (default): crossterm backend for a real terminal
//! - `logging`: forward host `tracing` events into the console
//! - `persist`: RON configuration files
//! - `bevy`: `ConsolePlugin` for Bevy apps
//! - `full`: Enable terminal + logging + persist
//!
//! # Quick Start
//!
//! ```ignore
//! use console_writer::prelude::*;
//!
//! fn main() -> std::io::Result<()> {
//!     let console = ConsoleService::stdout(ConsoleConfig::default())?;
//!
//!     console
//!         .add_command("echo", Command::new("Print the argument", |args| args.arg().to_string()))
//!         .ok();
//!     console
//!         .add_command("shutdown", Command::new("Stop the console", |args| {
//!             args.console().shutdown();
//!             String::new()
//!         }))
//!         .ok();
//!
//!     console.message("Console ready").ok();
//!     console.join();
//!     Ok(())
//! }
//! ```

// Core module (always available, no optional deps)
pub mod core;

// In-memory terminal for tests and headless hosts
pub mod testing;

// Re-export core types at crate root for convenience
pub use core::{
    Chunk, Message, Style, timestamp,
    ConsoleError,
    LifecycleCoordinator, LifecycleSignal, LifecycleTable, ProcessId, TeardownCallback,
    Command, CommandArgs, CommandHandler,
    CommandRegistry, Dispatch, HELP_USAGE, split_command,
    InputEditor, ACCEPTABLE_CHARACTERS, is_acceptable,
    Key, KeySource, Surface, Terminal, TerminalEvent,
    Scrollback, DEFAULT_SCROLLBACK,
    ConsoleConfig, DEFAULT_QUEUE_CAPACITY, RESERVED_ROWS,
    MessagePump, MessageQueue, Screen, SHUTDOWN_TEXT,
    ConsoleHandle, ConsoleService,
};

// Terminal backend (feature-gated)
#[cfg(feature = "terminal")]
pub mod terminal;

// Log capture (feature-gated)
#[cfg(feature = "logging")]
pub mod logging;

// Persistence module (feature-gated)
#[cfg(feature = "persist")]
pub mod persist;

// Bevy integration (feature-gated)
#[cfg(feature = "bevy")]
pub mod plugin;

#[cfg(feature = "terminal")]
pub use terminal::{CrosstermKeys, CrosstermSurface, CrosstermTerminal};

#[cfg(feature = "logging")]
pub use logging::ConsoleLayer;

#[cfg(feature = "persist")]
pub use persist::{ConfigError, ConsoleConfigFile, DEFAULT_CONFIG_FILE};

#[cfg(feature = "bevy")]
pub use plugin::{ConsoleLine, ConsolePlugin, ConsoleResource};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::core::{
        Command, CommandArgs,
        ConsoleConfig, ConsoleError, ConsoleHandle, ConsoleService,
        LifecycleCoordinator, LifecycleTable,
        Message, Style,
    };

    #[cfg(feature = "bevy")]
    pub use crate::plugin::{ConsoleLine, ConsolePlugin};
}
