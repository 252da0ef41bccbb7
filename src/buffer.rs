//! Bounded queue between the engine and the log flush task

use crate::models::ExecutionLogEntry;
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

/// Fixed-size FIFO of pending audit rows. Clones share one queue.
///
/// Producers never wait: once `capacity` rows are pending, new rows are
/// handed back to the caller instead of queued.
#[derive(Clone)]
pub struct LogBuffer {
    queue: Arc<ArrayQueue<ExecutionLogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    /// `capacity` must be non-zero
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            capacity,
        }
    }

    /// Queue `entry`, or give it back when no slot is free
    pub fn try_push(&self, entry: ExecutionLogEntry) -> Result<(), ExecutionLogEntry> {
        self.queue.push(entry)
    }

    /// Oldest rows first, at most `max` of them
    pub fn pop_batch(&self, max: usize) -> Vec<ExecutionLogEntry> {
        let mut batch = Vec::with_capacity(max.min(self.queue.len()));
        for _ in 0..max {
            match self.queue.pop() {
                Some(entry) => batch.push(entry),
                None => break,
            }
        }
        batch
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExecutionStatus;
    use uuid::Uuid;

    fn make_entry() -> ExecutionLogEntry {
        ExecutionLogEntry::new(Uuid::new_v4(), ExecutionStatus::Completed)
    }

    #[test]
    fn test_push_and_pop() {
        let buffer = LogBuffer::new(100);

        assert!(buffer.try_push(make_entry()).is_ok());
        assert_eq!(buffer.len(), 1);

        let batch = buffer.pop_batch(10);
        assert_eq!(batch.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_buffer_full() {
        let buffer = LogBuffer::new(2);

        assert!(buffer.try_push(make_entry()).is_ok());
        assert!(buffer.try_push(make_entry()).is_ok());
        assert!(buffer.try_push(make_entry()).is_err());
        assert_eq!(buffer.capacity(), 2);
    }

    #[test]
    fn test_pop_batch_max() {
        let buffer = LogBuffer::new(100);

        for _ in 0..50 {
            buffer.try_push(make_entry()).unwrap();
        }

        let batch = buffer.pop_batch(20);
        assert_eq!(batch.len(), 20);
        assert_eq!(buffer.len(), 30);
    }
}
