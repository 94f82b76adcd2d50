//! Drop-oldest ingestion buffer
//!
//! The producer (camera reader, replay feeder) never blocks: when the buffer
//! is full the oldest unconsumed item is discarded. The single consumer waits
//! on a [`Notify`] until an item arrives or the buffer is closed.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug)]
struct IngestState<T> {
    queue: VecDeque<T>,
    closed: bool,
    dropped: u64,
}

/// Bounded drop-oldest queue
#[derive(Debug)]
pub struct IngestBuffer<T> {
    state: Mutex<IngestState<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> IngestBuffer<T> {
    /// Capacity is clamped to at least one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        IngestBuffer {
            state: Mutex::new(IngestState {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue an item. Returns `false` when an older item was dropped to make
    /// room or when the buffer is closed.
    pub fn push(&self, item: T) -> bool {
        let kept = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            let mut kept = true;
            while state.queue.len() >= self.capacity {
                state.queue.pop_front();
                state.dropped += 1;
                kept = false;
            }
            state.queue.push_back(item);
            kept
        };
        if !kept {
            trace!("ingest buffer full, oldest item dropped");
        }
        self.notify.notify_one();
        kept
    }

    pub fn try_pop(&self) -> Option<T> {
        self.state.lock().queue.pop_front()
    }

    /// Wait for the next item. Returns `None` once closed and drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(item) = state.queue.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Stop accepting items; queued items can still be drained
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Items discarded under backpressure so far
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_single_slot_keeps_latest() {
        let buffer = IngestBuffer::new(1);
        assert!(buffer.push(1));
        assert!(!buffer.push(2));
        assert!(!buffer.push(3));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.try_pop(), Some(3));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let buffer: IngestBuffer<u8> = IngestBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
    }

    #[test]
    fn test_closed_rejects_push() {
        let buffer = IngestBuffer::new(4);
        buffer.close();
        assert!(!buffer.push(1));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let buffer = Arc::new(IngestBuffer::new(2));
        let producer = Arc::clone(&buffer);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push("sample");
        });
        let item = tokio::time::timeout(Duration::from_secs(2), buffer.recv())
            .await
            .unwrap();
        assert_eq!(item, Some("sample"));
    }

    #[tokio::test]
    async fn test_recv_drains_then_ends_after_close() {
        let buffer = IngestBuffer::new(4);
        buffer.push(1);
        buffer.push(2);
        buffer.close();
        assert_eq!(buffer.recv().await, Some(1));
        assert_eq!(buffer.recv().await, Some(2));
        assert_eq!(buffer.recv().await, None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn keeps_the_newest_samples(capacity in 0usize..6, pushes in 0usize..40) {
                let buffer = IngestBuffer::new(capacity);
                for i in 0..pushes {
                    prop_assert_eq!(buffer.push(i), i < buffer.capacity());
                }
                let kept = pushes.min(buffer.capacity());
                prop_assert_eq!(buffer.len(), kept);
                prop_assert_eq!(buffer.dropped() as usize, pushes - kept);

                let drained: Vec<_> = std::iter::from_fn(|| buffer.try_pop()).collect();
                let expected: Vec<_> = (pushes - kept..pushes).collect();
                prop_assert_eq!(drained, expected);
            }
        }
    }
}
