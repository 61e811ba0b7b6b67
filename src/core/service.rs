//! The running console: threads, host API, and teardown.
//!
//! [`ConsoleService`] owns the input and render threads and the terminal.
//! [`ConsoleHandle`] is the cheap, cloneable view the rest of the process
//! (command handlers included) uses to queue messages and register commands.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::{
    Command, CommandRegistry, ConsoleConfig, ConsoleError, Dispatch, InputEditor, Key, KeySource,
    LifecycleCoordinator, LifecycleSignal, LifecycleTable, Message, MessagePump, MessageQueue,
    Screen, Terminal, TerminalEvent,
};

struct Shared {
    queue: Arc<MessageQueue>,
    registry: CommandRegistry,
    signal: LifecycleSignal,
    /// Owns the lifecycle of a detached handle; `None` when a service owns it.
    _owner: Option<LifecycleCoordinator>,
}

/// Handle for submitting messages and commands to a console.
///
/// Cloning is cheap. Command handlers receive the handle through
/// [`CommandArgs::console`](super::CommandArgs::console) rather than
/// capturing one.
#[derive(Clone)]
pub struct ConsoleHandle {
    shared: Arc<Shared>,
}

impl ConsoleHandle {
    fn new(queue: Arc<MessageQueue>, signal: LifecycleSignal) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                registry: CommandRegistry::with_builtins(),
                signal,
                _owner: None,
            }),
        }
    }

    /// A handle with its own queue and built-in commands but no threads or terminal.
    ///
    /// Nothing is ever rendered; useful for exercising commands in isolation.
    pub fn detached() -> Self {
        let table = LifecycleTable::new();
        let owner = LifecycleCoordinator::new(&table, "DetachedConsole");
        Self {
            shared: Arc::new(Shared {
                queue: Arc::new(MessageQueue::new(super::DEFAULT_QUEUE_CAPACITY)),
                registry: CommandRegistry::with_builtins(),
                signal: owner.signal(),
                _owner: Some(owner),
            }),
        }
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.shared.registry
    }

    /// Queue a message for display.
    ///
    /// Messages are accepted until the render thread has drained the queue
    /// for the last time; after that this returns [`ConsoleError::ShutDown`].
    pub fn add_message(&self, message: Message) -> Result<(), ConsoleError> {
        self.shared.queue.push(message)
    }

    /// Queue `[timestamp] text`.
    pub fn message(&self, text: impl Into<String>) -> Result<(), ConsoleError> {
        self.add_message(Message::timestamped(text))
    }

    /// Queue `[timestamp] [ERROR] text`.
    pub fn error(&self, text: impl Into<String>) -> Result<(), ConsoleError> {
        self.add_message(Message::error(text))
    }

    /// Register a command under one name.
    ///
    /// Returns `Ok(true)` if newly registered, `Ok(false)` if it replaced an
    /// existing entry.
    pub fn add_command(
        &self,
        name: impl Into<Box<str>>,
        command: impl Into<Arc<Command>>,
    ) -> Result<bool, ConsoleError> {
        self.ensure_running()?;
        Ok(self.shared.registry.register(name, command))
    }

    /// Register one command under several names.
    ///
    /// Returns the number of names that were newly registered.
    pub fn add_commands<I, S>(
        &self,
        names: I,
        command: impl Into<Arc<Command>>,
    ) -> Result<usize, ConsoleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.ensure_running()?;
        Ok(self.shared.registry.register_all(names, command))
    }

    /// Echo `line` and run it as a command, as if typed and submitted.
    ///
    /// Blocks until the handler has returned and its output is queued. The
    /// command runs even when the queue cannot take the echo or the output;
    /// those lines are dropped with a warning. Only a requested shutdown
    /// rejects the line.
    pub fn submit(&self, line: &str) -> Result<Dispatch, ConsoleError> {
        self.ensure_running()?;
        self.queue_or_warn(Message::input_echo(line));

        let outcome = self.shared.registry.dispatch(line, self);
        if let Some(message) = outcome.clone().into_message() {
            self.queue_or_warn(message);
        }
        Ok(outcome)
    }

    fn queue_or_warn(&self, message: Message) {
        let text = message.body();
        if let Err(e) = self.add_message(message) {
            warn!("Console: dropped line '{}': {}", text, e);
        }
    }

    /// Request a graceful stop. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        self.shared.signal.request_shutdown();
    }

    /// Check if a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shared.signal.is_shutdown_requested()
    }

    /// Check if the render loop has drawn its final line and exited.
    pub fn is_stopped(&self) -> bool {
        self.shared.signal.is_finished()
    }

    /// Number of messages waiting to be rendered.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    fn ensure_running(&self) -> Result<(), ConsoleError> {
        if self.is_shutdown_requested() {
            Err(ConsoleError::ShutDown)
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    pub(crate) fn take_queued(&self) -> Vec<Message> {
        self.shared.queue.drain().into_iter().collect()
    }
}

impl std::fmt::Debug for ConsoleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleHandle")
            .field("pending", &self.pending())
            .field("shutdown_requested", &self.is_shutdown_requested())
            .finish_non_exhaustive()
    }
}

/// A running console.
///
/// Creating one takes over the terminal, draws the separator and input line,
/// and starts two threads: one reads keys and dispatches commands, the other
/// renders queued messages. Dropping the service requests shutdown, joins
/// both threads, releases the terminal, and finally tears down its
/// [`LifecycleCoordinator`] so dependents become deletable.
///
/// # Examples
///
/// ```
/// use console_writer::testing::memory_terminal;
/// use console_writer::{Command, ConsoleConfig, ConsoleService};
///
/// let (terminal, _surface, _keys) = memory_terminal(80, 24);
/// let console = ConsoleService::create(ConsoleConfig::default(), terminal).unwrap();
///
/// console
///     .add_command("echo", Command::new("Print the argument", |args| args.arg().to_string()))
///     .unwrap();
/// console.message("ready").unwrap();
///
/// console.shutdown();
/// console.join();
/// ```
pub struct ConsoleService {
    threads: Vec<JoinHandle<()>>,
    handle: ConsoleHandle,
    screen: Arc<Screen>,
    lifecycle: LifecycleCoordinator,
}

impl ConsoleService {
    /// Start a console on `terminal` with its own lifecycle table.
    pub fn create(config: ConsoleConfig, terminal: Terminal) -> io::Result<Self> {
        Self::create_in(&LifecycleTable::new(), config, terminal)
    }

    /// Start a console whose lifecycle is registered in `table`.
    ///
    /// Other components registered in the same table can depend on the
    /// console with [`LifecycleCoordinator::add_dependency`].
    pub fn create_in(
        table: &LifecycleTable,
        config: ConsoleConfig,
        terminal: Terminal,
    ) -> io::Result<Self> {
        let Terminal { surface, keys } = terminal;
        let lifecycle = LifecycleCoordinator::new(table, "Console");
        let queue = Arc::new(MessageQueue::new(config.queue_capacity));
        let handle = ConsoleHandle::new(Arc::clone(&queue), lifecycle.signal());
        let screen = Arc::new(Screen::new(
            surface,
            config.scrollback_capacity,
            config.separator,
        ));
        screen.repaint(Some(&InputEditor::new()))?;

        let pump = MessagePump::new(queue, Arc::clone(&screen), config.tick_interval);
        let render_signal = lifecycle.signal();
        let render = thread::Builder::new()
            .name("console-render".into())
            .spawn(move || pump.run(&render_signal))?;

        let input = {
            let handle = handle.clone();
            let screen = Arc::clone(&screen);
            let poll = config.input_poll_interval;
            thread::Builder::new()
                .name("console-input".into())
                .spawn(move || run_input(handle, screen, keys, poll))
        };
        let input = match input {
            Ok(input) => input,
            Err(e) => {
                lifecycle.request_shutdown();
                let _ = render.join();
                return Err(e);
            }
        };

        debug!("Console: started as {}", lifecycle.id());
        Ok(Self {
            threads: vec![input, render],
            handle,
            screen,
            lifecycle,
        })
    }

    /// Start a console on the process terminal via crossterm.
    #[cfg(feature = "terminal")]
    pub fn stdout(config: ConsoleConfig) -> io::Result<Self> {
        Self::create(config, crate::terminal::CrosstermTerminal::new()?.into_terminal())
    }

    /// A cloneable handle for other threads and components.
    pub fn handle(&self) -> &ConsoleHandle {
        &self.handle
    }

    /// The console's lifecycle.
    pub fn lifecycle(&self) -> &LifecycleCoordinator {
        &self.lifecycle
    }

    /// See [`ConsoleHandle::add_command`].
    pub fn add_command(
        &self,
        name: impl Into<Box<str>>,
        command: impl Into<Arc<Command>>,
    ) -> Result<bool, ConsoleError> {
        self.handle.add_command(name, command)
    }

    /// See [`ConsoleHandle::add_commands`].
    pub fn add_commands<I, S>(
        &self,
        names: I,
        command: impl Into<Arc<Command>>,
    ) -> Result<usize, ConsoleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.handle.add_commands(names, command)
    }

    /// See [`ConsoleHandle::add_message`].
    pub fn add_message(&self, message: Message) -> Result<(), ConsoleError> {
        self.handle.add_message(message)
    }

    /// See [`ConsoleHandle::message`].
    pub fn message(&self, text: impl Into<String>) -> Result<(), ConsoleError> {
        self.handle.message(text)
    }

    /// See [`ConsoleHandle::error`].
    pub fn error(&self, text: impl Into<String>) -> Result<(), ConsoleError> {
        self.handle.error(text)
    }

    /// Request a graceful stop. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// True once the render loop has finished and nothing this console
    /// depends on is still alive.
    pub fn is_deletable(&self) -> bool {
        self.lifecycle.is_deletable()
    }

    /// A copy of the rendered-message scrollback, oldest first.
    pub fn scrollback(&self) -> Vec<Message> {
        self.screen.scrollback()
    }

    /// Wait for both threads to exit, then tear the console down.
    ///
    /// Does not request shutdown: this blocks until something (a command,
    /// another thread, Ctrl+C) calls [`shutdown`](Self::shutdown).
    pub fn join(mut self) {
        self.join_threads();
    }

    fn join_threads(&mut self) {
        for thread in self.threads.drain(..) {
            let name = thread.thread().name().unwrap_or("console").to_string();
            if thread.join().is_err() {
                warn!("Console: thread '{}' panicked", name);
            }
        }
    }
}

impl Drop for ConsoleService {
    fn drop(&mut self) {
        self.shutdown();
        self.join_threads();
        debug!("Console: stopped");
    }
}

impl std::fmt::Debug for ConsoleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleService")
            .field("lifecycle", &self.lifecycle)
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

/// Input thread body: poll keys, edit the line, dispatch on Enter.
fn run_input(
    handle: ConsoleHandle,
    screen: Arc<Screen>,
    mut keys: Box<dyn KeySource>,
    poll: Duration,
) {
    let mut editor = InputEditor::new();
    debug!("Console: input loop started");

    while !handle.is_shutdown_requested() {
        let event = match keys.poll_event(poll) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!("Console: failed to read input: {}", e);
                thread::sleep(poll);
                continue;
            }
        };

        let drawn = match event {
            TerminalEvent::Resize => screen.repaint(Some(&editor)),
            TerminalEvent::Key(Key::Interrupt) => {
                handle.shutdown();
                Ok(())
            }
            TerminalEvent::Key(key) => match editor.handle_key(key) {
                Some(line) => {
                    // The editor is already empty; show that before the handler runs.
                    let cleared = screen.draw_input(&editor);
                    if let Err(e) = handle.submit(&line) {
                        warn!("Console: input '{}' not run: {}", line, e);
                    }
                    cleared
                }
                None => screen.draw_input(&editor),
            },
        };
        if let Err(e) = drawn {
            warn!("Console: failed to draw input line: {}", e);
        }
    }

    debug!("Console: input loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Style;

    fn bodies(messages: &[Message]) -> Vec<String> {
        messages.iter().map(|m| m.body()).collect()
    }

    #[test]
    fn test_submit_echo_then_result() {
        let console = ConsoleHandle::detached();
        console
            .add_command("echo", Command::new("Echo", |args| args.arg().to_string()))
            .unwrap();

        let outcome = console.submit("echo hello").unwrap();
        assert_eq!(outcome, Dispatch::Output("hello".to_string()));

        let queued = console.take_queued();
        assert_eq!(bodies(&queued), vec!["> echo hello", "hello"]);
        assert_eq!(queued[0].chunks()[1].style, Style::Input);
        assert!(!queued[1].is_error());
    }

    #[test]
    fn test_submit_unknown_command() {
        let console = ConsoleHandle::detached();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        console
            .add_command(
                "real",
                Command::new("Real", move |_| {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                    String::new()
                }),
            )
            .unwrap();

        console.submit("zzz").unwrap();
        let queued = console.take_queued();
        let errors: Vec<&Message> = queued.iter().filter(|m| m.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].text().contains("zzz"));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_silent_command_only_echoes() {
        let console = ConsoleHandle::detached();
        console
            .add_command("quiet", Command::new("Nothing", |_| String::new()))
            .unwrap();

        console.submit("quiet").unwrap();
        assert_eq!(bodies(&console.take_queued()), vec!["> quiet"]);
    }

    #[test]
    fn test_calls_after_shutdown_are_rejected() {
        let console = ConsoleHandle::detached();
        console.shutdown();
        console.shutdown();

        assert_eq!(
            console.add_command("late", Command::new("Late", |_| String::new())),
            Err(ConsoleError::ShutDown)
        );
        assert_eq!(console.submit("help"), Err(ConsoleError::ShutDown));
        // The queue itself stays open until the render loop closes it.
        assert!(console.message("still queued").is_ok());
    }

    #[test]
    fn test_handler_can_queue_extra_output() {
        let console = ConsoleHandle::detached();
        console
            .add_command(
                "twice",
                Command::new("Print twice", |args| {
                    let _ = args.console().message(args.arg());
                    args.arg().to_string()
                }),
            )
            .unwrap();

        console.submit("twice hi").unwrap();
        assert_eq!(bodies(&console.take_queued()), vec!["> twice hi", "hi", "hi"]);
    }

    #[test]
    fn test_submit_runs_command_when_queue_is_full() {
        let table = LifecycleTable::new();
        let owner = LifecycleCoordinator::new(&table, "Console");
        let console = ConsoleHandle::new(Arc::new(MessageQueue::new(1)), owner.signal());
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        console
            .add_command(
                "save",
                Command::new("Save", move |_| {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    "saved".to_string()
                }),
            )
            .unwrap();
        console.message("fill").unwrap();

        let outcome = console.submit("save").unwrap();
        assert_eq!(outcome, Dispatch::Output("saved".to_string()));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        // Echo and output were dropped; only the first line is queued.
        assert_eq!(bodies(&console.take_queued()), vec!["fill"]);
    }
}
