//! Message queue, screen state, and the render loop.
//!
//! Two locks live here and they are never held together:
//!
//! - the queue lock in [`MessageQueue`], taken by producers and by the
//!   render thread just long enough to swap the pending messages out;
//! - the draw lock in [`Screen`], taken exactly once by each public drawing
//!   call. Scrolling and repainting are helpers on the already-locked state.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::{
    ConsoleError, InputEditor, LifecycleSignal, Message, RESERVED_ROWS, Scrollback, Style,
    Surface,
};

/// Text drawn after the render loop exits.
pub const SHUTDOWN_TEXT: &str = "Console shut down.";

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<Message>,
    closed: bool,
}

/// Bounded multi-producer FIFO of messages waiting to be rendered.
#[derive(Debug)]
pub struct MessageQueue {
    state: Mutex<QueueState>,
    capacity: usize,
}

impl MessageQueue {
    /// Create a queue holding at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message.
    pub fn push(&self, message: Message) -> Result<(), ConsoleError> {
        let mut state = self.state();
        if state.closed {
            return Err(ConsoleError::ShutDown);
        }
        if state.messages.len() >= self.capacity {
            return Err(ConsoleError::QueueFull {
                capacity: self.capacity,
            });
        }
        state.messages.push_back(message);
        Ok(())
    }

    /// Take every pending message, oldest first.
    pub fn drain(&self) -> VecDeque<Message> {
        std::mem::take(&mut self.state().messages)
    }

    /// Refuse further messages and take whatever is still pending.
    pub fn close(&self) -> VecDeque<Message> {
        let mut state = self.state();
        state.closed = true;
        std::mem::take(&mut state.messages)
    }

    /// Check if the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Get the number of pending messages.
    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.state().messages.is_empty()
    }

    /// Get the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

struct ScreenState {
    surface: Box<dyn Surface>,
    scrollback: Scrollback,
    /// Row the next message is drawn on.
    next_row: u16,
    separator: char,
}

impl ScreenState {
    /// `(columns, message rows)`; message rows exclude the reserved rows.
    fn extent(&self) -> io::Result<(u16, u16)> {
        let (columns, rows) = self.surface.size()?;
        Ok((columns, rows.saturating_sub(RESERVED_ROWS)))
    }

    fn render_message(&mut self, message: Message) -> io::Result<()> {
        let (columns, visible) = self.extent()?;
        self.scrollback.push(message);
        if visible == 0 {
            return Ok(());
        }

        if self.next_row < visible {
            let row = self.next_row;
            self.next_row += 1;
            if let Some(message) = self.scrollback.iter().last() {
                draw_message(self.surface.as_mut(), row, message, columns)?;
            }
            Ok(())
        } else {
            self.repaint_window(columns, visible)?;
            self.draw_separator(columns, visible)
        }
    }

    /// Full repaint of the message rows from scrollback, oldest at the top.
    fn repaint_window(&mut self, columns: u16, visible: u16) -> io::Result<()> {
        let mut row = 0;
        for message in self.scrollback.last(visible as usize) {
            self.surface.clear_row(row)?;
            draw_message(self.surface.as_mut(), row, message, columns)?;
            row += 1;
        }
        self.next_row = row;
        while row < visible {
            self.surface.clear_row(row)?;
            row += 1;
        }
        Ok(())
    }

    fn draw_separator(&mut self, columns: u16, row: u16) -> io::Result<()> {
        let line: String = std::iter::repeat_n(self.separator, columns as usize).collect();
        self.surface.clear_row(row)?;
        self.surface.draw_text(row, 0, &line, Style::Normal)
    }

    fn draw_input(&mut self, editor: &InputEditor) -> io::Result<()> {
        let (columns, rows) = self.surface.size()?;
        if rows == 0 || columns == 0 {
            return Ok(());
        }
        let row = rows - 1;
        let (chars, cursor) = editor.visible(columns as usize);

        self.surface.clear_row(row)?;
        let text: String = chars.iter().collect();
        if !text.is_empty() {
            self.surface.draw_text(row, 0, &text, Style::Normal)?;
        }
        let under_cursor = chars.get(cursor).copied().unwrap_or(' ');
        self.surface
            .draw_text(row, cursor as u16, &under_cursor.to_string(), Style::Highlight)
    }

    fn repaint(&mut self, editor: Option<&InputEditor>) -> io::Result<()> {
        let (columns, visible) = self.extent()?;
        self.repaint_window(columns, visible)?;
        if self.surface.size()?.1 > visible {
            self.draw_separator(columns, visible)?;
        }
        if let Some(editor) = editor {
            self.draw_input(editor)?;
        }
        Ok(())
    }
}

/// Draw one message at `row`, clipped to `columns`.
fn draw_message(
    surface: &mut dyn Surface,
    row: u16,
    message: &Message,
    columns: u16,
) -> io::Result<()> {
    let mut column = 0u16;
    for chunk in message.chunks() {
        if column >= columns {
            break;
        }
        let available = (columns - column) as usize;
        // Control characters would move the terminal cursor off the row.
        let text: String = chunk
            .text
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .take(available)
            .collect();
        let width = text.chars().count() as u16;
        surface.draw_text(row, column, &text, chunk.style)?;
        column = column.saturating_add(width).saturating_add(1);
    }
    Ok(())
}

/// The draw surface plus the rendered-message bookkeeping, behind one lock.
pub struct Screen {
    state: Mutex<ScreenState>,
}

impl Screen {
    /// Wrap a surface.
    pub fn new(surface: Box<dyn Surface>, scrollback_capacity: usize, separator: char) -> Self {
        Self {
            state: Mutex::new(ScreenState {
                surface,
                scrollback: Scrollback::new(scrollback_capacity),
                next_row: 0,
                separator,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Draw messages in order, scrolling as needed.
    pub fn render<I>(&self, messages: I) -> io::Result<()>
    where
        I: IntoIterator<Item = Message>,
    {
        let mut state = self.state();
        for message in messages {
            state.render_message(message)?;
        }
        state.surface.flush()
    }

    /// Redraw the input line.
    pub fn draw_input(&self, editor: &InputEditor) -> io::Result<()> {
        let mut state = self.state();
        state.draw_input(editor)?;
        state.surface.flush()
    }

    /// Repaint the whole screen: message window, separator, and optionally the input line.
    pub fn repaint(&self, editor: Option<&InputEditor>) -> io::Result<()> {
        let mut state = self.state();
        state.repaint(editor)?;
        state.surface.flush()
    }

    /// A copy of the scrollback, oldest first.
    pub fn scrollback(&self) -> Vec<Message> {
        self.state().scrollback.iter().cloned().collect()
    }

    /// The row the next message will be drawn on.
    pub fn next_row(&self) -> u16 {
        self.state().next_row
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Screen")
            .field("next_row", &state.next_row)
            .field("scrollback", &state.scrollback.len())
            .finish_non_exhaustive()
    }
}

/// Marks the console finished when the render loop exits, even by panic.
struct FinishOnExit(LifecycleSignal);

impl Drop for FinishOnExit {
    fn drop(&mut self) {
        self.0.mark_finished();
    }
}

/// Moves messages from the queue onto the screen.
#[derive(Debug, Clone)]
pub struct MessagePump {
    queue: Arc<MessageQueue>,
    screen: Arc<Screen>,
    tick: Duration,
}

impl MessagePump {
    /// Create a pump between `queue` and `screen` that wakes every `tick`.
    pub fn new(queue: Arc<MessageQueue>, screen: Arc<Screen>, tick: Duration) -> Self {
        Self {
            queue,
            screen,
            tick,
        }
    }

    /// Queue a message for rendering. Callable from any thread.
    pub fn enqueue(&self, message: Message) -> Result<(), ConsoleError> {
        self.queue.push(message)
    }

    /// Drain the queue once and render everything in it.
    ///
    /// Returns the number of messages rendered.
    pub fn pump_once(&self) -> io::Result<usize> {
        let pending = self.queue.drain();
        let count = pending.len();
        if count > 0 {
            self.screen.render(pending)?;
        }
        Ok(count)
    }

    /// Run the render loop until `signal` requests shutdown.
    ///
    /// Messages queued before shutdown are still drawn. The queue is then
    /// closed, the shutdown line is drawn straight onto the screen, and the
    /// signal is marked finished.
    pub fn run(&self, signal: &LifecycleSignal) {
        let _finish = FinishOnExit(signal.clone());
        debug!("Console: render loop started");

        loop {
            thread::sleep(self.tick);
            let stopping = signal.is_shutdown_requested();
            if let Err(e) = self.pump_once() {
                warn!("Console: failed to render messages: {}", e);
            }
            if stopping {
                break;
            }
        }

        let remaining = self.queue.close();
        if let Err(e) = self.screen.render(remaining) {
            warn!("Console: failed to render final messages: {}", e);
        }
        if let Err(e) = self
            .screen
            .render(std::iter::once(Message::timestamped(SHUTDOWN_TEXT)))
        {
            warn!("Console: failed to draw shutdown message: {}", e);
        }
        debug!("Console: render loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySurface;
    use crate::{LifecycleCoordinator, LifecycleTable};

    fn screen(columns: u16, rows: u16) -> (Arc<Screen>, MemorySurface) {
        let surface = MemorySurface::new(columns, rows);
        let screen = Arc::new(Screen::new(Box::new(surface.clone()), 100, '-'));
        (screen, surface)
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = MessageQueue::new(10);
        queue.push(Message::plain("m1")).unwrap();
        queue.push(Message::plain("m2")).unwrap();
        queue.push(Message::plain("m3")).unwrap();

        let drained: Vec<String> = queue.drain().into_iter().map(|m| m.text()).collect();
        assert_eq!(drained, vec!["m1", "m2", "m3"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_bounds() {
        let queue = MessageQueue::new(2);
        queue.push(Message::plain("a")).unwrap();
        queue.push(Message::plain("b")).unwrap();
        assert_eq!(
            queue.push(Message::plain("c")),
            Err(ConsoleError::QueueFull { capacity: 2 })
        );

        let left = queue.close();
        assert_eq!(left.len(), 2);
        assert!(queue.is_closed());
        assert_eq!(queue.push(Message::plain("d")), Err(ConsoleError::ShutDown));
    }

    #[test]
    fn test_render_in_order_without_scrolling() {
        let (screen, surface) = screen(40, 10);
        screen
            .render(["m1", "m2", "m3"].into_iter().map(Message::plain))
            .unwrap();

        assert_eq!(surface.row_text(0), "m1");
        assert_eq!(surface.row_text(1), "m2");
        assert_eq!(surface.row_text(2), "m3");
        assert_eq!(screen.next_row(), 3);

        let stored: Vec<String> = screen.scrollback().iter().map(|m| m.text()).collect();
        assert_eq!(stored, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_scroll_repaints_last_messages() {
        // 6 rows: 4 message rows, separator, input.
        let (screen, surface) = screen(20, 6);
        screen.repaint(Some(&InputEditor::new())).unwrap();
        screen
            .render((1..=6).map(|i| Message::plain(format!("line {}", i))))
            .unwrap();

        assert_eq!(surface.row_text(0), "line 3");
        assert_eq!(surface.row_text(1), "line 4");
        assert_eq!(surface.row_text(2), "line 5");
        assert_eq!(surface.row_text(3), "line 6");
        assert_eq!(surface.row_text(4), "-".repeat(20));
        assert_eq!(screen.scrollback().len(), 6);
    }

    #[test]
    fn test_chunks_are_spaced_and_clipped() {
        let (screen, surface) = screen(12, 5);
        let msg = Message::new()
            .chunk("[t]", Style::Timestamp)
            .chunk("[ERROR]", Style::Error)
            .chunk("overflowing text", Style::Normal);
        screen.render([msg]).unwrap();

        assert_eq!(surface.row_text(0), "[t] [ERROR]");
        assert_eq!(surface.style_at(0, 0), Some(Style::Timestamp));
        assert_eq!(surface.style_at(0, 4), Some(Style::Error));
    }

    #[test]
    fn test_control_characters_are_blanked() {
        let (screen, surface) = screen(20, 5);
        screen.render([Message::plain("a\nb\tc")]).unwrap();

        assert_eq!(surface.row_text(0), "a b c");
        assert_eq!(surface.row_text(1), "");
        assert_eq!(screen.next_row(), 1);
        // Scrollback keeps the text as queued.
        assert_eq!(screen.scrollback()[0].text(), "a\nb\tc");
    }

    #[test]
    fn test_input_line_highlights_cursor() {
        let (screen, surface) = screen(20, 5);
        let mut editor = InputEditor::new();
        for c in "abc".chars() {
            editor.insert(c);
        }
        screen.draw_input(&editor).unwrap();
        assert_eq!(surface.row_text(4), "abc");
        assert_eq!(surface.style_at(4, 3), Some(Style::Highlight));

        editor.handle_key(crate::Key::Home);
        screen.draw_input(&editor).unwrap();
        assert_eq!(surface.style_at(4, 0), Some(Style::Highlight));
        assert_eq!(surface.style_at(4, 1), Some(Style::Normal));
    }

    #[test]
    fn test_tiny_terminal_keeps_scrollback() {
        let (screen, _surface) = screen(10, 2);
        screen.render([Message::plain("hidden")]).unwrap();
        assert_eq!(screen.scrollback().len(), 1);
        assert_eq!(screen.next_row(), 0);
    }

    #[test]
    fn test_run_drains_then_marks_finished() {
        let table = LifecycleTable::new();
        let lifecycle = LifecycleCoordinator::new(&table, "pump");
        let (screen, surface) = screen(40, 10);
        let queue = Arc::new(MessageQueue::new(100));
        let pump = MessagePump::new(Arc::clone(&queue), screen, Duration::from_millis(1));

        pump.enqueue(Message::plain("before")).unwrap();
        lifecycle.request_shutdown();
        pump.run(&lifecycle.signal());

        assert!(lifecycle.is_finished());
        assert_eq!(surface.row_text(0), "before");
        assert!(surface.row_text(1).ends_with(SHUTDOWN_TEXT));
        assert_eq!(pump.enqueue(Message::plain("after")), Err(ConsoleError::ShutDown));
    }
}
