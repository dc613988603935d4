//! Shared pool of pending message UIDs.

use std::sync::Mutex;

/// LIFO pool drained by the workers.
///
/// `pop` never blocks: an empty backlog is a terminal condition, not a
/// wait state. Popping under the lock hands out each UID at most once,
/// no matter how many workers drain concurrently.
#[derive(Debug, Default)]
pub struct Backlog {
    items: Mutex<Vec<u32>>,
}

impl Backlog {
    pub fn new(uids: Vec<u32>) -> Self {
        Self {
            items: Mutex::new(uids),
        }
    }

    /// Take the most recently pushed UID, or `None` when drained.
    pub fn pop(&self) -> Option<u32> {
        self.items.lock().unwrap().pop()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
