//! The editable command line.
//!
//! [`InputEditor`] is a line buffer with a cursor driven by [`Key`] events.
//! It is owned by the input thread and never shared.

use super::Key;

/// Every character the input line accepts. Anything else is silently dropped.
pub const ACCEPTABLE_CHARACTERS: &str = " abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"£$%^&*()+-=_[]{}@:;'#~?/|.,<>\\";

/// Check whether a character may be typed into the input line.
#[inline]
pub fn is_acceptable(c: char) -> bool {
    ACCEPTABLE_CHARACTERS.contains(c)
}

/// Line buffer with a cursor.
///
/// The cursor always satisfies `0 <= cursor <= len`.
///
/// `Up` and `Down` are accepted but do nothing: there is no history recall.
///
/// # Examples
///
/// ```
/// use console_writer::{InputEditor, Key};
///
/// let mut editor = InputEditor::new();
/// for c in "helo".chars() {
///     editor.handle_key(Key::Char(c));
/// }
/// editor.handle_key(Key::Left);
/// editor.handle_key(Key::Char('l'));
/// assert_eq!(editor.handle_key(Key::Enter), Some("hello".to_string()));
/// assert!(editor.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputEditor {
    buffer: Vec<char>,
    cursor: usize,
}

impl InputEditor {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one key event.
    ///
    /// Returns the committed line on [`Key::Enter`]; the buffer is cleared
    /// before the line is returned, so the caller dispatches a snapshot.
    pub fn handle_key(&mut self, key: Key) -> Option<String> {
        match key {
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => {
                if self.cursor < self.buffer.len() {
                    self.cursor += 1;
                }
            }
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.buffer.len(),
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buffer.remove(self.cursor);
                }
            }
            Key::Delete => {
                if self.cursor < self.buffer.len() {
                    self.buffer.remove(self.cursor);
                }
            }
            Key::Enter => return Some(self.take()),
            Key::Char(c) => {
                self.insert(c);
            }
            // Reserved.
            Key::Up | Key::Down => {}
            Key::Interrupt => {}
        }
        None
    }

    /// Insert a character at the cursor if it is acceptable.
    ///
    /// Returns `false` if the character was dropped.
    pub fn insert(&mut self, c: char) -> bool {
        if !is_acceptable(c) {
            return false;
        }
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    /// Snapshot the buffer and reset to empty.
    pub fn take(&mut self) -> String {
        let line: String = self.buffer.drain(..).collect();
        self.cursor = 0;
        line
    }

    /// The current buffer contents.
    pub fn content(&self) -> String {
        self.buffer.iter().collect()
    }

    /// The cursor position, in characters.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The number of characters in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The slice of the buffer that fits in `width` columns, and the cursor
    /// column within it.
    ///
    /// The window scrolls horizontally so the cursor stays visible; when the
    /// cursor sits past the last character it occupies one extra column.
    pub fn visible(&self, width: usize) -> (&[char], usize) {
        if width == 0 {
            return (&[], 0);
        }
        let start = (self.cursor + 1).saturating_sub(width);
        let end = self.buffer.len().min(start + width);
        (&self.buffer[start..end], self.cursor - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputEditor {
        let mut editor = InputEditor::new();
        for c in text.chars() {
            editor.handle_key(Key::Char(c));
        }
        editor
    }

    fn assert_cursor_in_bounds(editor: &InputEditor) {
        assert!(editor.cursor() <= editor.len());
    }

    #[test]
    fn test_insert_and_cursor() {
        let editor = typed("abc");
        assert_eq!(editor.content(), "abc");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn test_insert_mid_buffer() {
        let mut editor = typed("ac");
        editor.handle_key(Key::Left);
        editor.handle_key(Key::Char('b'));
        assert_eq!(editor.content(), "abc");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn test_rejects_characters_outside_whitelist() {
        let mut editor = typed("a");
        assert!(!editor.insert('\u{7}'));
        editor.handle_key(Key::Char('é'));
        editor.handle_key(Key::Char('`'));
        editor.handle_key(Key::Char('\n'));
        assert_eq!(editor.content(), "a");
        assert_eq!(editor.cursor(), 1);

        assert!(editor.insert('£'));
        assert!(editor.insert(' '));
        assert_eq!(editor.content(), "a£ ");
    }

    #[test]
    fn test_arrows_stop_at_boundaries() {
        let mut editor = typed("xy");
        editor.handle_key(Key::Right);
        assert_eq!(editor.cursor(), 2);

        for _ in 0..5 {
            editor.handle_key(Key::Left);
            assert_cursor_in_bounds(&editor);
        }
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_backspace() {
        let mut editor = typed("abc");
        editor.handle_key(Key::Left);
        editor.handle_key(Key::Backspace);
        assert_eq!(editor.content(), "ac");
        assert_eq!(editor.cursor(), 1);

        editor.handle_key(Key::Home);
        editor.handle_key(Key::Backspace);
        assert_eq!(editor.content(), "ac");
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_delete_and_end() {
        let mut editor = typed("abc");
        editor.handle_key(Key::Home);
        editor.handle_key(Key::Delete);
        assert_eq!(editor.content(), "bc");
        editor.handle_key(Key::End);
        editor.handle_key(Key::Delete);
        assert_eq!(editor.content(), "bc");
        assert_eq!(editor.cursor(), 2);
    }

    #[test]
    fn test_up_down_are_noops() {
        let mut editor = typed("abc");
        editor.handle_key(Key::Left);
        let before = editor.clone();
        assert_eq!(editor.handle_key(Key::Up), None);
        assert_eq!(editor.handle_key(Key::Down), None);
        assert_eq!(editor, before);
    }

    #[test]
    fn test_enter_commits_and_clears() {
        let mut editor = typed("echo hello");
        editor.handle_key(Key::Left);
        assert_eq!(editor.handle_key(Key::Enter), Some("echo hello".to_string()));
        assert!(editor.is_empty());
        assert_eq!(editor.cursor(), 0);

        assert_eq!(editor.handle_key(Key::Enter), Some(String::new()));
    }

    #[test]
    fn test_cursor_invariant_over_mixed_events() {
        let keys = [
            Key::Char('a'),
            Key::Backspace,
            Key::Backspace,
            Key::Left,
            Key::Char('b'),
            Key::Char('c'),
            Key::Right,
            Key::Right,
            Key::Home,
            Key::Delete,
            Key::Delete,
            Key::End,
            Key::Left,
            Key::Enter,
            Key::Right,
        ];
        let mut editor = InputEditor::new();
        for key in keys {
            editor.handle_key(key);
            assert_cursor_in_bounds(&editor);
        }
    }

    #[test]
    fn test_visible_window_follows_cursor() {
        let editor = typed("abcdefgh");
        let (chars, col) = editor.visible(4);
        assert_eq!(chars.iter().collect::<String>(), "fgh");
        assert_eq!(col, 3);

        let mut editor = editor;
        editor.handle_key(Key::Home);
        let (chars, col) = editor.visible(4);
        assert_eq!(chars.iter().collect::<String>(), "abcd");
        assert_eq!(col, 0);

        assert_eq!(editor.visible(0).0.len(), 0);
    }
}
