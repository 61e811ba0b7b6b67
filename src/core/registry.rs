//! Command registry and dispatch.
//!
//! Maps command names to shared [`Command`]s. Several names may point at the
//! same command. Dispatch runs the handler on the calling thread with the
//! table lock released, so a handler may itself register commands or query
//! the registry.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{Command, CommandArgs, ConsoleHandle, Message};

/// Usage text printed by `help` with no argument.
pub const HELP_USAGE: &str =
    "Type \"help <command>\" for help with that command. Type \"commands\" for a list of commands.";

/// Outcome of dispatching one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The line was blank; nothing ran.
    Blank,
    /// The handler ran and returned text.
    Output(String),
    /// The handler ran and returned nothing.
    Silent,
    /// No command is registered under this name.
    NotFound(String),
    /// The handler panicked.
    Failed {
        /// The command name.
        name: String,
        /// The panic payload, if it was a string.
        reason: String,
    },
}

impl Dispatch {
    /// The message this outcome should produce on the console, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Dispatch::Blank | Dispatch::Silent => None,
            Dispatch::Output(text) => Some(Message::timestamped(text)),
            Dispatch::NotFound(name) => {
                Some(Message::error(format!("Command \"{}\" not found.", name)))
            }
            Dispatch::Failed { name, reason } => Some(Message::error(format!(
                "Command \"{}\" failed: {}",
                name, reason
            ))),
        }
    }
}

/// Split a line at its first whitespace character.
///
/// Returns `(name, argument)`. The argument is empty when there is no
/// whitespace and is otherwise the verbatim remainder after that character.
pub fn split_command(line: &str) -> (&str, &str) {
    match line.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => (&line[..i], &line[i + c.len_utf8()..]),
        None => (line, ""),
    }
}

/// Central registry for console commands.
///
/// # Examples
///
/// ```
/// use console_writer::{Command, CommandRegistry, ConsoleHandle, Dispatch};
///
/// let console = ConsoleHandle::detached();
/// let registry = console.registry();
/// registry.register("echo", Command::new("Echo the argument", |args| args.arg().to_string()));
///
/// assert_eq!(
///     registry.dispatch("echo hello  world", &console),
///     Dispatch::Output("hello  world".to_string()),
/// );
/// ```
#[derive(Default)]
pub struct CommandRegistry {
    commands: Mutex<HashMap<Box<str>, Arc<Command>>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in `commands` and `help` commands.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn commands(&self) -> MutexGuard<'_, HashMap<Box<str>, Arc<Command>>> {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a command under one name.
    ///
    /// Returns `true` if newly registered, `false` if it replaced an existing entry.
    /// A warning is logged when an entry is replaced.
    pub fn register(&self, name: impl Into<Box<str>>, command: impl Into<Arc<Command>>) -> bool {
        let name = name.into();
        let command = command.into();
        let replaced = self.commands().insert(name.clone(), command).is_some();

        if replaced {
            warn!("Console: Overwriting existing command '{}'", name);
        }
        !replaced
    }

    /// Register one command under several names.
    ///
    /// Returns the number of names that were newly registered.
    pub fn register_all<I, S>(&self, names: I, command: impl Into<Arc<Command>>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        let command = command.into();
        names
            .into_iter()
            .map(|name| self.register(name, Arc::clone(&command)))
            .filter(|is_new| *is_new)
            .count()
    }

    /// Get a command by name.
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands().get(name).cloned()
    }

    /// Check if a command exists.
    pub fn contains(&self, name: &str) -> bool {
        self.commands().contains_key(name)
    }

    /// Get the number of registered names.
    pub fn len(&self) -> usize {
        self.commands().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.commands().is_empty()
    }

    /// All registered names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands().keys().map(|k| k.to_string()).collect();
        names.sort();
        names
    }

    /// Run the command named by the first word of `line`.
    ///
    /// The handler runs on the calling thread. Panics inside the handler are
    /// caught here and reported as [`Dispatch::Failed`].
    pub fn dispatch(&self, line: &str, console: &ConsoleHandle) -> Dispatch {
        if line.trim().is_empty() {
            return Dispatch::Blank;
        }

        let (name, arg) = split_command(line);
        // Clone the command out so the table is unlocked while the handler runs.
        let Some(command) = self.get(name) else {
            debug!("Console: unknown command '{}'", name);
            return Dispatch::NotFound(name.to_string());
        };

        debug!("Console: dispatching '{}'", name);
        let args = CommandArgs::new(line, name, arg, console);
        match panic::catch_unwind(AssertUnwindSafe(|| command.execute(&args))) {
            Ok(output) if output.is_empty() => Dispatch::Silent,
            Ok(output) => Dispatch::Output(output),
            Err(panic_info) => {
                let reason = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                warn!("Console: command '{}' panicked: {}", name, reason);
                Dispatch::Failed {
                    name: name.to_string(),
                    reason,
                }
            }
        }
    }

    /// Register the built-in `commands` and `help` commands.
    pub fn register_builtins(&self) {
        // commands - List every registered name
        self.register(
            "commands",
            Command::new("List all commands", |args| {
                format!("Commands: {}", args.console().registry().names().join(", "))
            }),
        );

        // help - Generic usage, or the description of one command
        self.register(
            "help",
            Command::new(
                "Type \"help <command>\" for help with that command.",
                |args| {
                    let name = args.arg().trim();
                    if name.is_empty() {
                        return HELP_USAGE.to_string();
                    }

                    match args.console().registry().get(name) {
                        Some(command) => format!("{}: {}", name, command.description()),
                        None => format!(
                            "Command \"{}\" not found, type \"commands\" to list all commands.",
                            name
                        ),
                    }
                },
            ),
        );
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo() -> Command {
        Command::new("Echo the argument", |args| args.arg().to_string())
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("add 1 2 3"), ("add", "1 2 3"));
        assert_eq!(split_command("shutdown"), ("shutdown", ""));
        assert_eq!(split_command("say  two  spaces "), ("say", " two  spaces "));
        assert_eq!(split_command("tab\targ"), ("tab", "arg"));
    }

    #[test]
    fn test_dispatch_routes_argument() {
        let console = ConsoleHandle::detached();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let record = Arc::clone(&seen);
        console.registry().register(
            "add",
            Command::new("Add numbers", move |args| {
                record.lock().unwrap().push(args.arg().to_string());
                String::new()
            }),
        );
        let record = Arc::clone(&seen);
        console.registry().register(
            "shutdown",
            Command::new("Stop", move |args| {
                record.lock().unwrap().push(args.arg().to_string());
                String::new()
            }),
        );

        assert_eq!(console.registry().dispatch("add 1 2 3", &console), Dispatch::Silent);
        assert_eq!(console.registry().dispatch("shutdown", &console), Dispatch::Silent);
        assert_eq!(*seen.lock().unwrap(), vec!["1 2 3".to_string(), String::new()]);
    }

    #[test]
    fn test_unknown_command() {
        let console = ConsoleHandle::detached();
        let outcome = console.registry().dispatch("zzz now", &console);
        assert_eq!(outcome, Dispatch::NotFound("zzz".to_string()));

        let msg = outcome.into_message().unwrap();
        assert!(msg.is_error());
        assert!(msg.text().contains("Command \"zzz\" not found."));
    }

    #[test]
    fn test_blank_line_runs_nothing() {
        let console = ConsoleHandle::detached();
        assert_eq!(console.registry().dispatch("   ", &console), Dispatch::Blank);
        assert_eq!(console.registry().dispatch("", &console), Dispatch::Blank);
    }

    #[test]
    fn test_overwrite_last_writer_wins() {
        let registry = CommandRegistry::new();
        let console = ConsoleHandle::detached();

        assert!(registry.register("greet", Command::new("v1", |_| "one".to_string())));
        assert!(!registry.register("greet", Command::new("v2", |_| "two".to_string())));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("greet").unwrap().description(), "v2");
        assert_eq!(
            registry.dispatch("greet", &console),
            Dispatch::Output("two".to_string())
        );
    }

    #[test]
    fn test_register_all_shares_command() {
        let registry = CommandRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let console = ConsoleHandle::detached();

        let added = registry.register_all(
            ["quit", "exit", "q"],
            Command::new("Leave", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                String::new()
            }),
        );
        assert_eq!(added, 3);

        registry.dispatch("exit", &console);
        registry.dispatch("q", &console);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&registry.get("quit").unwrap(), &registry.get("q").unwrap()));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let console = ConsoleHandle::detached();
        console
            .registry()
            .register("boom", Command::new("Explode", |_| panic!("kaboom")));

        let outcome = console.registry().dispatch("boom", &console);
        assert_eq!(
            outcome,
            Dispatch::Failed {
                name: "boom".to_string(),
                reason: "kaboom".to_string(),
            }
        );
        assert!(outcome.into_message().unwrap().is_error());

        // The registry is still usable afterwards.
        assert!(matches!(
            console.registry().dispatch("commands", &console),
            Dispatch::Output(_)
        ));
    }

    #[test]
    fn test_commands_builtin_is_sorted() {
        let console = ConsoleHandle::detached();
        let registry = console.registry();
        registry.register("zeta", echo());
        registry.register("alpha", echo());
        registry.register("mid", echo());

        assert_eq!(
            registry.dispatch("commands", &console),
            Dispatch::Output("Commands: alpha, commands, help, mid, zeta".to_string())
        );
    }

    #[test]
    fn test_help_builtin() {
        let console = ConsoleHandle::detached();
        let registry = console.registry();
        registry.register("echo", echo());

        assert_eq!(
            registry.dispatch("help", &console),
            Dispatch::Output(HELP_USAGE.to_string())
        );
        assert_eq!(
            registry.dispatch("help echo", &console),
            Dispatch::Output("echo: Echo the argument".to_string())
        );
        assert_eq!(
            registry.dispatch("help nope", &console),
            Dispatch::Output(
                "Command \"nope\" not found, type \"commands\" to list all commands.".to_string()
            )
        );
    }

    #[test]
    fn test_handler_can_use_registry() {
        let console = ConsoleHandle::detached();
        console.registry().register(
            "define",
            Command::new("Define a command", |args| {
                let name = args.arg().to_string();
                args.console()
                    .registry()
                    .register(name, Command::new("Defined at runtime", |_| "ok".to_string()));
                String::new()
            }),
        );

        assert_eq!(console.registry().dispatch("define late", &console), Dispatch::Silent);
        assert_eq!(
            console.registry().dispatch("late", &console),
            Dispatch::Output("ok".to_string())
        );
    }
}
