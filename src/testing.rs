//! In-memory terminal for tests and headless hosts.
//!
//! [`MemorySurface`] records what the console draws in a cell grid that can
//! be inspected from another thread. [`KeySender`] feeds key events to the
//! console's input thread through a channel.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use console_writer::testing::memory_terminal;
//! use console_writer::{ConsoleConfig, ConsoleService};
//!
//! let (terminal, surface, keys) = memory_terminal(60, 12);
//! let console = ConsoleService::create(ConsoleConfig::default(), terminal).unwrap();
//!
//! keys.type_line("help");
//! let deadline = Instant::now() + Duration::from_secs(5);
//! while !surface.contains("Type \"help <command>\"") && Instant::now() < deadline {
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//! assert!(surface.contains("Type \"help <command>\""));
//!
//! console.shutdown();
//! drop(console);
//! assert!(surface.contains("Console shut down."));
//! ```

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::core::{Key, KeySource, Style, Surface, Terminal, TerminalEvent};

#[derive(Debug)]
struct Grid {
    columns: u16,
    rows: u16,
    cells: Vec<Vec<(char, Style)>>,
    flushes: usize,
}

impl Grid {
    fn blank_row(columns: u16) -> Vec<(char, Style)> {
        vec![(' ', Style::Normal); columns as usize]
    }
}

/// A [`Surface`] backed by a shared cell grid.
///
/// Clones share the same grid.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    grid: Arc<Mutex<Grid>>,
}

impl MemorySurface {
    /// Create a blank surface of `columns` x `rows`.
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            grid: Arc::new(Mutex::new(Grid {
                columns,
                rows,
                cells: (0..rows).map(|_| Grid::blank_row(columns)).collect(),
                flushes: 0,
            })),
        }
    }

    fn grid(&self) -> MutexGuard<'_, Grid> {
        self.grid.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the reported size, keeping whatever still fits.
    pub fn resize(&self, columns: u16, rows: u16) {
        let mut grid = self.grid();
        grid.cells.resize_with(rows as usize, || Grid::blank_row(columns));
        for row in grid.cells.iter_mut() {
            row.resize(columns as usize, (' ', Style::Normal));
        }
        grid.columns = columns;
        grid.rows = rows;
    }

    /// The text of a row with trailing blanks removed.
    pub fn row_text(&self, row: u16) -> String {
        self.grid()
            .cells
            .get(row as usize)
            .map(|cells| {
                let text: String = cells.iter().map(|(c, _)| *c).collect();
                text.trim_end().to_string()
            })
            .unwrap_or_default()
    }

    /// The text of every row, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let rows = self.grid().rows;
        (0..rows).map(|row| self.row_text(row)).collect()
    }

    /// Check if any row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    /// The style of one cell.
    pub fn style_at(&self, row: u16, column: u16) -> Option<Style> {
        self.grid()
            .cells
            .get(row as usize)
            .and_then(|cells| cells.get(column as usize))
            .map(|(_, style)| *style)
    }

    /// How many times the surface has been flushed.
    pub fn flush_count(&self) -> usize {
        self.grid().flushes
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> io::Result<(u16, u16)> {
        let grid = self.grid();
        Ok((grid.columns, grid.rows))
    }

    fn clear_row(&mut self, row: u16) -> io::Result<()> {
        let mut grid = self.grid();
        let columns = grid.columns;
        if let Some(cells) = grid.cells.get_mut(row as usize) {
            *cells = Grid::blank_row(columns);
        }
        Ok(())
    }

    fn draw_text(&mut self, row: u16, column: u16, text: &str, style: Style) -> io::Result<()> {
        let mut grid = self.grid();
        if let Some(cells) = grid.cells.get_mut(row as usize) {
            for (offset, c) in text.chars().enumerate() {
                match cells.get_mut(column as usize + offset) {
                    Some(cell) => *cell = (c, style),
                    None => break,
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.grid().flushes += 1;
        Ok(())
    }
}

/// A [`KeySource`] fed from a channel.
#[derive(Debug)]
pub struct ScriptedKeys {
    receiver: Receiver<TerminalEvent>,
}

impl KeySource for ScriptedKeys {
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<TerminalEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // No more input will ever arrive; keep the poll cadence.
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

/// The sending side of a [`ScriptedKeys`] source.
#[derive(Debug, Clone)]
pub struct KeySender {
    sender: Sender<TerminalEvent>,
}

impl KeySender {
    /// Send one key.
    pub fn key(&self, key: Key) {
        let _ = self.sender.send(TerminalEvent::Key(key));
    }

    /// Type each character of `text`.
    pub fn type_text(&self, text: &str) {
        for c in text.chars() {
            self.key(Key::Char(c));
        }
    }

    /// Type `text` and press Enter.
    pub fn type_line(&self, text: &str) {
        self.type_text(text);
        self.key(Key::Enter);
    }

    /// Report a terminal resize.
    pub fn resize(&self) {
        let _ = self.sender.send(TerminalEvent::Resize);
    }
}

/// Create a connected key sender and key source.
pub fn scripted_keys() -> (KeySender, ScriptedKeys) {
    let (sender, receiver) = mpsc::channel();
    (KeySender { sender }, ScriptedKeys { receiver })
}

/// A [`Terminal`] over a [`MemorySurface`] and [`ScriptedKeys`].
///
/// Returns the terminal plus handles to inspect the surface and send keys.
pub fn memory_terminal(columns: u16, rows: u16) -> (Terminal, MemorySurface, KeySender) {
    let surface = MemorySurface::new(columns, rows);
    let (sender, keys) = scripted_keys();
    (Terminal::new(surface.clone(), keys), surface, sender)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_surface_draw_and_clip() {
        let mut surface = MemorySurface::new(5, 2);
        surface.draw_text(0, 2, "hello", Style::Error).unwrap();
        assert_eq!(surface.row_text(0), "  hel");
        assert_eq!(surface.style_at(0, 2), Some(Style::Error));
        assert_eq!(surface.style_at(0, 0), Some(Style::Normal));

        surface.clear_row(0).unwrap();
        assert_eq!(surface.row_text(0), "");
        // Out of range rows are ignored.
        surface.draw_text(9, 0, "x", Style::Normal).unwrap();
    }

    #[test]
    fn test_memory_surface_resize() {
        let mut surface = MemorySurface::new(4, 2);
        surface.draw_text(1, 0, "abcd", Style::Normal).unwrap();
        surface.resize(2, 3);
        assert_eq!(surface.size().unwrap(), (2, 3));
        assert_eq!(surface.row_text(1), "ab");
        assert_eq!(surface.lines().len(), 3);
    }

    #[test]
    fn test_scripted_keys() {
        let (sender, mut keys) = scripted_keys();
        sender.type_line("a");

        let timeout = Duration::from_millis(10);
        assert_eq!(
            keys.poll_event(timeout).unwrap(),
            Some(TerminalEvent::Key(Key::Char('a')))
        );
        assert_eq!(
            keys.poll_event(timeout).unwrap(),
            Some(TerminalEvent::Key(Key::Enter))
        );
        assert_eq!(keys.poll_event(timeout).unwrap(), None);
    }
}
