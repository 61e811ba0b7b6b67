//! Bevy integration.
//!
//! [`ConsolePlugin`] starts a [`ConsoleService`] when the app is built and
//! stores it as the [`ConsoleResource`]. Systems write [`ConsoleLine`]
//! messages to print, and the app exits once the console has shut down.
//!
//! ```ignore
//! use bevy::prelude::*;
//! use console_writer::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(ConsolePlugin::default())
//!         .add_systems(Startup, greet)
//!         .run();
//! }
//!
//! fn greet(mut lines: MessageWriter<ConsoleLine>) {
//!     lines.write(ConsoleLine::info("Server started"));
//! }
//! ```

use std::sync::{Mutex, PoisonError};

use bevy::prelude::*;

use crate::core::{ConsoleConfig, ConsoleService, Message as ConsoleMessage, Terminal};

/// A line for the console, written by any system.
#[derive(Message, Debug, Clone)]
pub struct ConsoleLine {
    /// The text.
    pub text: String,
    /// Draw as an error line.
    pub error: bool,
}

impl ConsoleLine {
    /// A regular timestamped line.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: false,
        }
    }

    /// An error line.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: true,
        }
    }
}

/// The running console.
#[derive(Resource, Deref)]
pub struct ConsoleResource(pub ConsoleService);

/// Main console plugin.
///
/// With the `terminal` feature, [`ConsolePlugin::default`] takes over the
/// process terminal. Pass a [`Terminal`] to [`ConsolePlugin::new`] to run on
/// anything else.
#[derive(Default)]
pub struct ConsolePlugin {
    config: ConsoleConfig,
    terminal: Mutex<Option<Terminal>>,
}

impl ConsolePlugin {
    /// Run the console on `terminal`.
    pub fn new(terminal: Terminal) -> Self {
        Self {
            config: ConsoleConfig::default(),
            terminal: Mutex::new(Some(terminal)),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    fn take_terminal(&self) -> Option<Terminal> {
        let provided = self
            .terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if provided.is_some() {
            return provided;
        }

        #[cfg(feature = "terminal")]
        match crate::terminal::CrosstermTerminal::new() {
            Ok(terminal) => return Some(terminal.into_terminal()),
            Err(e) => error!("Failed to acquire terminal: {}", e),
        }

        None
    }
}

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConsoleLine>();

        let Some(terminal) = self.take_terminal() else {
            warn!("ConsolePlugin: no terminal available, console disabled");
            return;
        };

        match ConsoleService::create(self.config.clone(), terminal) {
            Ok(console) => {
                app.insert_resource(ConsoleResource(console))
                    .add_systems(Update, (forward_console_lines, exit_when_stopped).chain());
            }
            Err(e) => error!("ConsolePlugin: failed to start console: {}", e),
        }
    }
}

/// Queue every [`ConsoleLine`] written this frame.
fn forward_console_lines(mut lines: MessageReader<ConsoleLine>, console: Res<ConsoleResource>) {
    for line in lines.read() {
        let message = if line.error {
            ConsoleMessage::error(line.text.clone())
        } else {
            ConsoleMessage::timestamped(line.text.clone())
        };
        if let Err(e) = console.add_message(message) {
            debug!("Dropped console line '{}': {}", line.text, e);
        }
    }
}

/// Exit the app once the console has shut down.
fn exit_when_stopped(
    console: Res<ConsoleResource>,
    mut exit: MessageWriter<AppExit>,
    mut sent: Local<bool>,
) {
    if !*sent && console.is_deletable() {
        *sent = true;
        exit.write(AppExit::Success);
    }
}
