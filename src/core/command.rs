//! Console command implementation.
//!
//! A [`Command`] is a description plus a handler that maps the argument text
//! of an input line to response text.

use super::ConsoleHandle;

/// Arguments passed to a command handler.
#[derive(Clone, Copy)]
pub struct CommandArgs<'a> {
    /// The full submitted line.
    raw: &'a str,
    /// The name the command was invoked by.
    name: &'a str,
    /// Everything after the first whitespace character, verbatim.
    arg: &'a str,
    console: &'a ConsoleHandle,
}

impl<'a> CommandArgs<'a> {
    /// Create new command args.
    pub fn new(raw: &'a str, name: &'a str, arg: &'a str, console: &'a ConsoleHandle) -> Self {
        Self {
            raw,
            name,
            arg,
            console,
        }
    }

    /// Get the raw input line.
    #[inline]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Get the name the command was invoked by.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Get the argument string, including interior whitespace.
    #[inline]
    pub fn arg(&self) -> &'a str {
        self.arg
    }

    /// Check if there is no argument.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arg.is_empty()
    }

    /// Iterate over the whitespace separated words of the argument.
    pub fn words(&self) -> impl Iterator<Item = &'a str> {
        self.arg.split_whitespace()
    }

    /// Try to parse the word at `index` as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, index: usize) -> Option<T> {
        self.words().nth(index).and_then(|s| s.parse().ok())
    }

    /// The console the command was submitted to.
    ///
    /// Handlers use this to queue extra output or request shutdown without
    /// capturing a handle of their own.
    #[inline]
    pub fn console(&self) -> &'a ConsoleHandle {
        self.console
    }
}

impl std::fmt::Debug for CommandArgs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandArgs")
            .field("raw", &self.raw)
            .field("name", &self.name)
            .field("arg", &self.arg)
            .finish_non_exhaustive()
    }
}

/// Type alias for command handler functions.
///
/// The returned text is queued as a normal message; an empty string means
/// "no output".
pub type CommandHandler = Box<dyn Fn(&CommandArgs) -> String + Send + Sync>;

/// A console command with a handler function.
///
/// # Examples
///
/// ```
/// use console_writer::Command;
///
/// let echo = Command::new("Print the argument back", |args| args.arg().to_string());
/// assert_eq!(echo.description(), "Print the argument back");
/// ```
pub struct Command {
    description: Box<str>,
    handler: CommandHandler,
}

impl Command {
    /// Create a new command with the given description and handler.
    pub fn new<F>(description: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&CommandArgs) -> String + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            handler: Box::new(handler),
        }
    }

    /// Get the description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Execute the handler.
    pub fn execute(&self, args: &CommandArgs) -> String {
        (self.handler)(args)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
