// colloquy/src/memory.rs

//! Rolling buffer of results from earlier tasks.

use crate::models::chat::Message;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded FIFO of transcript turns. When full, the oldest turn is dropped
/// so the buffer always holds the most recent results.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    entries: VecDeque<Message>,
    capacity: usize,
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ShortTermMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn add(&mut self, message: Message) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Content of every retained turn, oldest first, joined into one
    /// context block.
    pub fn dump(&self) -> String {
        self.entries
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_joins_entries_oldest_first() {
        let mut memory = ShortTermMemory::new();
        memory.add(Message::assistant("first"));
        memory.add(Message::assistant("second"));
        assert_eq!(memory.dump(), "first\nsecond");
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut memory = ShortTermMemory::with_capacity(2);
        memory.add(Message::assistant("a"));
        memory.add(Message::assistant("b"));
        memory.add(Message::assistant("c"));
        assert_eq!(memory.dump(), "b\nc");
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut memory = ShortTermMemory::new();
        memory.add(Message::user("x"));
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.dump(), "");
    }
}
