//! Styled console output lines.
//!
//! A [`Message`] is the unit the render pump draws: one terminal row made of
//! styled chunks. Producers build one, hand it to the console, and never see
//! it again.

use chrono::Local;

/// Style tag attached to each chunk of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    /// Regular output (white).
    #[default]
    Normal,
    /// Inverted text, used for the input cursor (black on white).
    Highlight,
    /// Error marker (red).
    Error,
    /// Leading timestamp (cyan).
    Timestamp,
    /// Echo of submitted input (magenta).
    Input,
}

/// A single styled chunk of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// How the chunk is drawn.
    pub style: Style,
}

/// One renderable line of console output.
///
/// Chunks are drawn left to right with one blank column between them.
///
/// # Examples
///
/// ```
/// use console_writer::{Message, Style};
///
/// let msg = Message::new()
///     .chunk("[build]", Style::Highlight)
///     .chunk("finished in 3s", Style::Normal);
/// assert_eq!(msg.text(), "[build] finished in 3s");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    chunks: Vec<Chunk>,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn chunk(mut self, text: impl Into<String>, style: Style) -> Self {
        self.push_chunk(text, style);
        self
    }

    /// Append a chunk in place.
    pub fn push_chunk(&mut self, text: impl Into<String>, style: Style) {
        self.chunks.push(Chunk {
            text: text.into(),
            style,
        });
    }

    /// A single unstyled chunk.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().chunk(text, Style::Normal)
    }

    /// `[timestamp] text`
    pub fn timestamped(text: impl Into<String>) -> Self {
        Self::new()
            .chunk(timestamp(true), Style::Timestamp)
            .chunk(text, Style::Normal)
    }

    /// `[timestamp] [ERROR] text`
    pub fn error(text: impl Into<String>) -> Self {
        Self::new()
            .chunk(timestamp(true), Style::Timestamp)
            .chunk("[ERROR]", Style::Error)
            .chunk(text, Style::Normal)
    }

    /// `[timestamp] > text`, the echo of a submitted input line.
    pub fn input_echo(text: impl Into<String>) -> Self {
        Self::new()
            .chunk(timestamp(true), Style::Timestamp)
            .chunk(">", Style::Input)
            .chunk(text, Style::Normal)
    }

    /// The chunks in draw order.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Check whether any chunk carries the error style.
    pub fn is_error(&self) -> bool {
        self.chunks.iter().any(|c| c.style == Style::Error)
    }

    /// The message as drawn, without styling.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.chunks.iter().map(|c| c.text.as_str()).collect();
        parts.join(" ")
    }

    /// The message text without its leading timestamp chunk, if any.
    pub fn body(&self) -> String {
        let parts: Vec<&str> = self
            .chunks
            .iter()
            .skip_while(|c| c.style == Style::Timestamp)
            .map(|c| c.text.as_str())
            .collect();
        parts.join(" ")
    }
}

/// Local wall-clock time as `YYYY-MM-DD HH:MM:SS`, optionally wrapped in brackets.
pub fn timestamp(padded: bool) -> String {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S");
    if padded {
        format!("[{}]", now)
    } else {
        now.to_string()
    }
}
