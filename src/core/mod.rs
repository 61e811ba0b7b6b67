//! Core console types with no optional dependencies.
//!
//! This module provides the building blocks:
//! - [`LifecycleCoordinator`] - Shutdown flags and teardown observers for a long-lived component
//! - [`CommandRegistry`] - Name to [`Command`] map with built-in `help` and `commands`
//! - [`InputEditor`] - The single-line editor behind the input row
//! - [`MessagePump`] - Moves queued messages onto the [`Screen`]
//! - [`ConsoleService`] - Owns the threads and the terminal; [`ConsoleHandle`] talks to it

mod error;
mod message;
mod lifecycle;
mod command;
mod registry;
mod input;
mod surface;
mod scrollback;
mod config;
mod pump;
mod service;

pub use error::ConsoleError;
pub use message::{Chunk, Message, Style, timestamp};
pub use lifecycle::{
    LifecycleCoordinator, LifecycleSignal, LifecycleTable, ProcessId, TeardownCallback,
};
pub use command::{Command, CommandArgs, CommandHandler};
pub use registry::{CommandRegistry, Dispatch, HELP_USAGE, split_command};
pub use input::{ACCEPTABLE_CHARACTERS, InputEditor, is_acceptable};
pub use surface::{Key, KeySource, Surface, Terminal, TerminalEvent};
pub use scrollback::{DEFAULT_SCROLLBACK, Scrollback};
pub use config::{ConsoleConfig, DEFAULT_QUEUE_CAPACITY, RESERVED_ROWS};
pub use pump::{MessagePump, MessageQueue, SHUTDOWN_TEXT, Screen};
pub use service::{ConsoleHandle, ConsoleService};
