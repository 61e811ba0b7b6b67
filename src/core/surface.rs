//! The terminal interface the console draws on and reads keys from.
//!
//! Drawing and key input are separate traits so the render thread can hold
//! the draw surface while the input thread blocks on a key poll.

use std::io;
use std::time::Duration;

use super::Style;

/// A key the input line reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Cursor left.
    Left,
    /// Cursor right.
    Right,
    /// Reserved; no effect.
    Up,
    /// Reserved; no effect.
    Down,
    /// Cursor to start of line.
    Home,
    /// Cursor to end of line.
    End,
    /// Delete the character before the cursor.
    Backspace,
    /// Delete the character under the cursor.
    Delete,
    /// Submit the line.
    Enter,
    /// A typed character.
    Char(char),
    /// Ctrl+C: request console shutdown.
    Interrupt,
}

/// An input event read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A key press.
    Key(Key),
    /// The terminal was resized.
    Resize,
}

/// A grid of character cells the console draws on.
///
/// Rows and columns are zero-based from the top-left corner.
pub trait Surface: Send {
    /// Visible extent as `(columns, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Blank an entire row.
    fn clear_row(&mut self, row: u16) -> io::Result<()>;

    /// Draw styled text starting at `(row, column)`.
    ///
    /// The caller clips text to the visible width.
    fn draw_text(&mut self, row: u16, column: u16, text: &str, style: Style) -> io::Result<()>;

    /// Make everything drawn so far visible.
    fn flush(&mut self) -> io::Result<()>;
}

/// A source of terminal input events.
pub trait KeySource: Send {
    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when the timeout elapses without input, so the
    /// caller can check its stop flag between polls.
    fn poll_event(&mut self, timeout: Duration) -> io::Result<Option<TerminalEvent>>;
}

/// A drawing surface paired with its key source.
pub struct Terminal {
    /// Where output is drawn.
    pub surface: Box<dyn Surface>,
    /// Where key events come from.
    pub keys: Box<dyn KeySource>,
}

impl Terminal {
    /// Pair a surface with a key source.
    pub fn new(surface: impl Surface + 'static, keys: impl KeySource + 'static) -> Self {
        Self {
            surface: Box::new(surface),
            keys: Box::new(keys),
        }
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal").finish_non_exhaustive()
    }
}
