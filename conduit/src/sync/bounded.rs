//! Bounded blocking FIFO queue for in-process (inter-thread) communication.
//!
//! A fixed-capacity buffer guarded by a single mutex with two condition
//! variables. Callers block in [`BoundedQueue::put`] while the queue is full
//! and in [`BoundedQueue::get`] while it is empty.
//!
//! # Overview
//!
//! - Any number of threads may call `put` and `get` through a shared reference
//!   (typically an `Arc<BoundedQueue<T>>`).
//! - With one producer and one consumer, items come out in insertion order.
//! - With several producers or consumers, every item is dequeued exactly once,
//!   but no global order across producers is promised.
//!
//! # Example
//!
//! ```
//! use conduit::sync::bounded::BoundedQueue;
//!
//! let queue = BoundedQueue::new(2)?;
//! queue.put(1);
//! queue.put(2);
//! assert!(queue.is_full());
//!
//! assert_eq!(queue.get(), 1);
//! assert_eq!(queue.get(), 2);
//! assert!(queue.is_empty());
//! # Ok::<(), conduit::sync::bounded::QueueError>(())
//! ```
//!
//! # Signaling
//!
//! Every insertion wakes at most one thread parked on `not_empty` and every
//! removal wakes at most one thread parked on `not_full`. Each transition frees
//! or fills exactly one slot, so one wake per transition is sufficient. Woken
//! threads always re-check their predicate before proceeding.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::trace::trace;

/// Errors returned when constructing a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The requested capacity was zero.
    #[error("queue capacity must be greater than 0, got {0}")]
    InvalidCapacity(usize),
}

/// Snapshot classification of a queue's fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// No items buffered.
    Empty,
    /// Some items buffered, at least one free slot.
    Partial,
    /// Buffered items equal the capacity.
    Full,
}

impl QueueState {
    fn classify(len: usize, capacity: usize) -> Self {
        if len == 0 {
            Self::Empty
        } else if len >= capacity {
            Self::Full
        } else {
            Self::Partial
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Partial => "partial",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

/// Thread-safe FIFO queue with a fixed maximum length.
pub struct BoundedQueue<T> {
    /// Maximum number of buffered items. Never zero.
    capacity: usize,
    /// Buffered items, head at the front.
    buffer: Mutex<VecDeque<T>>,
    /// Signaled after a removal frees a slot.
    not_full: Condvar,
    /// Signaled after an insertion fills a slot.
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    /// Appends `item` to the tail, blocking while the queue is full.
    pub fn put(&self, item: T) {
        let mut buffer = self.lock();
        while buffer.len() >= self.capacity {
            trace!(capacity = self.capacity, "put blocked on full queue");
            buffer = self
                .not_full
                .wait(buffer)
                .unwrap_or_else(PoisonError::into_inner);
        }
        buffer.push_back(item);
        self.not_empty.notify_one();
    }

    /// Removes and returns the head, blocking while the queue is empty.
    #[must_use = "the dequeued item is lost if unused"]
    pub fn get(&self) -> T {
        let mut buffer = self.lock();
        loop {
            if let Some(item) = buffer.pop_front() {
                self.not_full.notify_one();
                return item;
            }
            trace!("get blocked on empty queue");
            buffer = self
                .not_empty
                .wait(buffer)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Appends `item` if a slot is free, without blocking.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full, allowing retry.
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let mut buffer = self.lock();
        if buffer.len() >= self.capacity {
            return Err(item);
        }
        buffer.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes and returns the head if one is buffered, without blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        let item = self.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Returns the number of buffered items. The value may be stale on return.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no items are buffered. The value may be stale on return.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if the queue is at capacity. The value may be stale on return.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    /// Returns the fill level as a [`QueueState`]. The value may be stale on return.
    #[must_use]
    pub fn state(&self) -> QueueState {
        QueueState::classify(self.lock().len(), self.capacity)
    }

    /// Returns the maximum number of buffered items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquires the buffer lock.
    ///
    /// No caller code runs while the lock is held, so the buffer is consistent
    /// even if a previous holder panicked; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BoundedQueue::<u32>::new(0);
        assert_eq!(result.unwrap_err(), QueueError::InvalidCapacity(0));
    }

    #[test]
    fn test_put_get_single_thread() {
        let queue = BoundedQueue::new(3).unwrap();

        queue.put(1);
        queue.put(2);
        queue.put(3);

        assert_eq!(queue.len(), 3);
        assert!(queue.is_full());
        assert_eq!(queue.state(), QueueState::Full);

        assert_eq!(queue.get(), 1);
        assert_eq!(queue.get(), 2);
        assert_eq!(queue.get(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn test_state_transitions() {
        let queue = BoundedQueue::new(2).unwrap();
        assert_eq!(queue.state(), QueueState::Empty);

        queue.put('a');
        assert_eq!(queue.state(), QueueState::Partial);
        queue.put('b');
        assert_eq!(queue.state(), QueueState::Full);

        let _ = queue.get();
        assert_eq!(queue.state(), QueueState::Partial);
        let _ = queue.get();
        assert_eq!(queue.state(), QueueState::Empty);
    }

    #[test]
    fn test_capacity_one() {
        let queue = BoundedQueue::new(1).unwrap();
        assert_eq!(queue.capacity(), 1);

        queue.put("only");
        assert!(queue.is_full());
        assert!(!queue.is_empty());
        assert_eq!(queue.get(), "only");
        assert!(queue.is_empty());
        assert!(!queue.is_full());
    }

    #[test]
    fn test_try_put_when_full() {
        let queue = BoundedQueue::new(2).unwrap();

        assert!(queue.try_put(1).is_ok());
        assert!(queue.try_put(2).is_ok());
        assert_eq!(queue.try_put(3), Err(3));

        assert_eq!(queue.try_get(), Some(1));
        assert!(queue.try_put(3).is_ok());
        assert_eq!(queue.try_put(4), Err(4));
    }

    #[test]
    fn test_try_get_when_empty() {
        let queue = BoundedQueue::<u64>::new(4).unwrap();
        assert_eq!(queue.try_get(), None);

        queue.put(7);
        assert_eq!(queue.try_get(), Some(7));
        assert_eq!(queue.try_get(), None);
    }

    #[test]
    fn test_wrapping_behavior() {
        let queue = BoundedQueue::new(4).unwrap();

        for round in 0..5u64 {
            for i in 0..4 {
                queue.put(round * 10 + i);
            }
            for i in 0..4 {
                assert_eq!(queue.get(), round * 10 + i);
            }
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_put_blocks_until_get() {
        let queue = Arc::new(BoundedQueue::new(1).unwrap());
        queue.put(0u32);

        let put_done = Arc::new(AtomicBool::new(false));
        let handle = {
            let queue = Arc::clone(&queue);
            let put_done = Arc::clone(&put_done);
            thread::spawn(move || {
                queue.put(1);
                put_done.store(true, Ordering::Release);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!put_done.load(Ordering::Acquire), "put should block while full");
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.get(), 0);
        handle.join().unwrap();
        assert!(put_done.load(Ordering::Acquire));
        assert_eq!(queue.get(), 1);
    }

    #[test]
    fn test_get_blocks_until_put() {
        let queue = Arc::new(BoundedQueue::<u32>::new(4).unwrap());

        let handle = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.get())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished(), "get should block while empty");

        queue.put(42);
        assert_eq!(handle.join().unwrap(), 42);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_fifo_order() {
        let queue = Arc::new(BoundedQueue::new(2).unwrap());
        let count = 1000u64;

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..count {
                    queue.put(i);
                }
            })
        };

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || (0..count).map(|_| queue.get()).collect::<Vec<_>>())
        };

        producer.join().unwrap();
        let received = consumer.join().unwrap();

        for (i, &val) in received.iter().enumerate() {
            assert_eq!(val, i as u64);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_never_exceeds_capacity_under_contention() {
        let capacity = 3;
        let queue = Arc::new(BoundedQueue::new(capacity).unwrap());
        let num_producers = 4;
        let items_per_producer = 250;
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for p in 0..num_producers {
            let queue = Arc::clone(&queue);
            let max_seen = Arc::clone(&max_seen);
            handles.push(thread::spawn(move || {
                for i in 0..items_per_producer {
                    queue.put(p * 1000 + i);
                    max_seen.fetch_max(queue.len(), Ordering::Relaxed);
                }
            }));
        }

        let mut items = Vec::with_capacity(num_producers * items_per_producer);
        for _ in 0..num_producers * items_per_producer {
            items.push(queue.get());
            max_seen.fetch_max(queue.len(), Ordering::Relaxed);
        }

        for h in handles {
            h.join().unwrap();
        }

        assert!(max_seen.load(Ordering::Relaxed) <= capacity);
        assert!(queue.is_empty());

        // Every item exactly once, per-producer order preserved
        items.sort_unstable();
        let expected: Vec<_> = (0..num_producers)
            .flat_map(|p| (0..items_per_producer).map(move |i| p * 1000 + i))
            .collect();
        assert_eq!(items, expected);
    }

    #[test]
    fn test_multiple_blocked_consumers_all_woken() {
        let queue = Arc::new(BoundedQueue::<usize>::new(1).unwrap());
        let num_consumers = 4;

        let handles: Vec<_> = (0..num_consumers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.get())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        for i in 0..num_consumers {
            queue.put(i);
        }

        let mut received: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        received.sort_unstable();
        assert_eq!(received, (0..num_consumers).collect::<Vec<_>>());
    }

    #[test]
    fn test_usable_after_poisoned_lock() {
        let queue = Arc::new(BoundedQueue::new(2).unwrap());
        queue.put(1);

        let poisoner = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let _guard = queue.buffer.lock().unwrap();
                panic!("poison the queue lock");
            })
        };
        assert!(poisoner.join().is_err());

        queue.put(2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(), 1);
        assert_eq!(queue.get(), 2);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(QueueState::Empty.to_string(), "empty");
        assert_eq!(QueueState::Partial.to_string(), "partial");
        assert_eq!(QueueState::Full.to_string(), "full");
    }
}
