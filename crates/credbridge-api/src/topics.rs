//! Bounded buffer of recent verification messages.
//!
//! Every accepted `POST /verify` body is appended; `GET /verify/topics`
//! removes the oldest. When full, the oldest message is dropped to make
//! room.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct TopicBuffer {
    inner: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl TopicBuffer {
    /// A buffer holding at most `capacity` messages (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            capacity,
        }
    }

    /// Append a message, returning the one evicted to make room, if any.
    pub fn push(&self, message: String) -> Option<String> {
        let mut queue = self.inner.lock();
        let evicted = if queue.len() >= self.capacity {
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(message);
        evicted
    }

    /// Remove and return the oldest message.
    pub fn pop(&self) -> Option<String> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_arrival_order() {
        let topics = TopicBuffer::new(4);
        topics.push("a".into());
        topics.push("b".into());
        assert_eq!(topics.pop().as_deref(), Some("a"));
        assert_eq!(topics.pop().as_deref(), Some("b"));
        assert!(topics.pop().is_none());
        assert!(topics.is_empty());
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let topics = TopicBuffer::new(2);
        assert!(topics.push("a".into()).is_none());
        assert!(topics.push("b".into()).is_none());
        assert_eq!(topics.push("c".into()).as_deref(), Some("a"));
        assert_eq!(topics.len(), 2);
        assert_eq!(topics.pop().as_deref(), Some("b"));
    }

    #[test]
    fn clones_share_the_queue() {
        let topics = TopicBuffer::new(0);
        assert_eq!(topics.capacity(), 1);
        let other = topics.clone();
        other.push("x".into());
        assert_eq!(topics.pop().as_deref(), Some("x"));
    }
}
