//! Bounded history of rendered messages.

use std::collections::VecDeque;

use super::Message;

/// Default number of messages kept for repainting.
pub const DEFAULT_SCROLLBACK: usize = 100;

/// Bounded FIFO of already-rendered messages, oldest first.
///
/// Used to repaint the visible window when output scrolls; it is not a
/// history the user can browse.
#[derive(Debug, Clone)]
pub struct Scrollback {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Scrollback {
    /// Create a scrollback holding at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting and returning the oldest if full.
    pub fn push(&mut self, message: Message) -> Option<Message> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    /// The newest `count` messages, oldest first.
    pub fn last(&self, count: usize) -> impl Iterator<Item = &Message> {
        let skip = self.messages.len().saturating_sub(count);
        self.messages.iter().skip(skip)
    }

    /// Iterate over all messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Get the number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the scrollback is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_exactly_the_oldest() {
        let mut scrollback = Scrollback::default();
        for i in 0..100 {
            assert!(scrollback.push(Message::plain(i.to_string())).is_none());
        }
        assert_eq!(scrollback.len(), 100);

        let evicted = scrollback.push(Message::plain("100"));
        assert_eq!(evicted.map(|m| m.text()), Some("0".to_string()));
        assert_eq!(scrollback.len(), 100);
        assert_eq!(scrollback.iter().next().unwrap().text(), "1");
        assert_eq!(scrollback.iter().last().unwrap().text(), "100");
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut scrollback = Scrollback::new(3);
        for i in 0..50 {
            scrollback.push(Message::plain(i.to_string()));
            assert!(scrollback.len() <= 3);
        }
    }

    #[test]
    fn test_last_is_oldest_first() {
        let mut scrollback = Scrollback::new(10);
        for text in ["a", "b", "c", "d"] {
            scrollback.push(Message::plain(text));
        }
        let tail: Vec<String> = scrollback.last(2).map(|m| m.text()).collect();
        assert_eq!(tail, vec!["c", "d"]);

        let all: Vec<String> = scrollback.last(20).map(|m| m.text()).collect();
        assert_eq!(all, vec!["a", "b", "c", "d"]);
    }
}
