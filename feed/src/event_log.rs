use std::collections::VecDeque;

use crate::types::LiveMessage;

pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 10;

/// Bounded, newest-first log of recent events.
///
/// Invariants:
/// - `len() <= capacity()` after every call
/// - index 0 is always the most recently pushed entry
#[derive(Clone, Debug)]
pub struct EventLog<T = LiveMessage> {
    /// Front = newest.
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> EventLog<T> {
    /// A capacity of 0 is raised to 1 so the newest entry is always visible.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.entries.get(idx)
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> EventLog<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for EventLog<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_ten_of_twelve_newest_first() {
        let mut log = EventLog::new(10);
        for i in 1..=12 {
            log.push(i);
        }

        assert_eq!(log.len(), 10);
        assert_eq!(log.to_vec(), (3..=12).rev().collect::<Vec<_>>());
        assert!(!log.iter().any(|v| *v == 1 || *v == 2));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut log = EventLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.to_vec(), vec!["b"]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut log: EventLog<u32> = EventLog::default();
        log.push(1);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.latest(), None);
        assert_eq!(log.capacity(), DEFAULT_EVENT_LOG_CAPACITY);
    }
}
