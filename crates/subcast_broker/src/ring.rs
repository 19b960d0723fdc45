use std::collections::VecDeque;
use std::sync::RwLock;

use subcast_protocol::Message;

/// Fixed-capacity store of the most recent messages on one topic.
///
/// Once full, an append overwrites the oldest entry. Reads take a consistent
/// snapshot: the returned sequence is always a suffix of the total insertion
/// order, with no duplicates or gaps relative to concurrent appends.
#[derive(Debug)]
pub struct RingBuffer {
    buf: RwLock<VecDeque<Message>>,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.read().unwrap().is_empty()
    }

    /// Append a message, evicting the oldest entry when full. A zero-capacity
    /// buffer retains nothing.
    pub fn add(&self, message: Message) {
        if self.capacity == 0 {
            return;
        }
        let mut buf = self.buf.write().unwrap();
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(message);
    }

    /// Up to `n` most recent messages, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Message> {
        if n == 0 {
            return Vec::new();
        }
        let buf = self.buf.read().unwrap();
        let skip = buf.len().saturating_sub(n);
        buf.iter().skip(skip).cloned().collect()
    }
}
