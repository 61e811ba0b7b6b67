//! Crossterm backend for running the console on a real terminal.
//!
//! [`CrosstermTerminal::new`] switches the terminal into raw mode on the
//! alternate screen. The terminal is restored when the surface is dropped,
//! which happens when the owning [`ConsoleService`](crate::ConsoleService)
//! is dropped or its creation fails.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{QueueableCommand, cursor, execute};
use tracing::debug;

use crate::core::{Key, KeySource, Style, Surface, Terminal, TerminalEvent};

/// Restores the terminal on drop, including during unwinding.
#[derive(Debug)]
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, cursor::Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        debug!("Terminal: raw mode enabled");
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), ResetColor, cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        debug!("Terminal: restored");
    }
}

/// Foreground and optional background color for a style.
fn colors(style: Style) -> (Color, Option<Color>) {
    match style {
        Style::Normal => (Color::White, None),
        Style::Highlight => (Color::Black, Some(Color::White)),
        Style::Error => (Color::Red, None),
        Style::Timestamp => (Color::Cyan, None),
        Style::Input => (Color::Magenta, None),
    }
}

/// A [`Surface`] that draws to stdout.
#[derive(Debug)]
pub struct CrosstermSurface {
    out: Stdout,
    _guard: TerminalGuard,
}

impl Surface for CrosstermSurface {
    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn clear_row(&mut self, row: u16) -> io::Result<()> {
        self.out
            .queue(cursor::MoveTo(0, row))?
            .queue(terminal::Clear(ClearType::CurrentLine))?;
        Ok(())
    }

    fn draw_text(&mut self, row: u16, column: u16, text: &str, style: Style) -> io::Result<()> {
        let (foreground, background) = colors(style);
        self.out
            .queue(cursor::MoveTo(column, row))?
            .queue(SetForegroundColor(foreground))?;
        if let Some(background) = background {
            self.out.queue(SetBackgroundColor(background))?;
        }
        self.out.queue(Print(text))?.queue(ResetColor)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// A [`KeySource`] reading crossterm events.
#[derive(Debug, Default)]
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<TerminalEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(map_event(event::read()?))
    }
}

/// Translate a crossterm event into one the console reacts to.
fn map_event(event: Event) -> Option<TerminalEvent> {
    match event {
        Event::Key(key) => map_key(key).map(TerminalEvent::Key),
        Event::Resize(_, _) => Some(TerminalEvent::Resize),
        _ => None,
    }
}

fn map_key(key: KeyEvent) -> Option<Key> {
    // Some platforms also report releases and repeats.
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    let key = match key.code {
        KeyCode::Char('c') if control => Key::Interrupt,
        KeyCode::Char(_) if control => return None,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Enter => Key::Enter,
        _ => return None,
    };
    Some(key)
}

/// The process terminal, in raw mode on the alternate screen.
#[derive(Debug)]
pub struct CrosstermTerminal {
    surface: CrosstermSurface,
    keys: CrosstermKeys,
}

impl CrosstermTerminal {
    /// Take over the terminal.
    pub fn new() -> io::Result<Self> {
        let guard = TerminalGuard::enter()?;
        Ok(Self {
            surface: CrosstermSurface {
                out: io::stdout(),
                _guard: guard,
            },
            keys: CrosstermKeys,
        })
    }

    /// Convert into the pair a [`ConsoleService`](crate::ConsoleService) runs on.
    pub fn into_terminal(self) -> Terminal {
        Terminal::new(self.surface, self.keys)
    }
}
