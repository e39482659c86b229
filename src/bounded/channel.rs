//! Producer/consumer handles over a shared [`BoundedQueue`].
//!
//! # Overview
//! [`BoundedQueueChannel::split`] builds one queue and returns a
//! [`Producer`] and a [`Consumer`] that share it through an `Arc`. Both
//! handles are cheap to clone, so any number of producer and consumer
//! threads can hold their own copy. Producers can only insert and consumers
//! can only remove, which keeps each thread's role explicit at the type level.
//!
//! # Example
//! ```
//! use bbq::BoundedQueueChannel;
//! use std::thread;
//!
//! let (producer, consumer) = BoundedQueueChannel::split(4).unwrap();
//!
//! let t = thread::spawn(move || {
//!     for i in 0..100u32 {
//!         producer.insert(i);
//!     }
//! });
//!
//! for i in 0..100u32 {
//!     assert_eq!(consumer.remove().0, i);
//! }
//! t.join().unwrap();
//! ```

use super::inner_queue::{BoundedQueue, Position, QueueState};
use crate::error::QueueError;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for splitting a bounded queue into its producer and consumer halves.
pub struct BoundedQueueChannel;

impl BoundedQueueChannel {
    /// Creates a queue with the specified capacity.
    ///
    /// Returns a pair of [`Producer`] and [`Consumer`] handles that share
    /// the same underlying buffer. Fails if `capacity` is zero.
    pub fn split<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>), QueueError> {
        let inner = Arc::new(BoundedQueue::new(capacity)?);
        let producer = Producer {
            inner: Arc::clone(&inner),
        };
        let consumer = Consumer { inner };
        Ok((producer, consumer))
    }
}

/// The inserting half of a bounded queue.
///
/// Clones share the same queue.
pub struct Producer<T> {
    inner: Arc<BoundedQueue<T>>,
}

impl<T> Producer<T> {
    /// Inserts a value, blocking while the queue is full.
    #[inline]
    pub fn insert(&self, value: T) -> Position {
        self.inner.insert(value)
    }

    /// Attempts to insert a value without blocking.
    ///
    /// Returns `Err(value)` if the queue is full.
    #[inline]
    pub fn try_insert(&self, value: T) -> Result<Position, T> {
        self.inner.try_insert(value)
    }

    /// Inserts a value, waiting at most `timeout` for a free slot.
    #[inline]
    pub fn insert_timeout(&self, value: T, timeout: Duration) -> Result<Position, T> {
        self.inner.insert_timeout(value, timeout)
    }

    /// Returns `true` if the queue is currently full.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Returns the capacity of the queue.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Returns the current occupancy state.
    #[inline(always)]
    pub fn state(&self) -> QueueState {
        self.inner.state()
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// The removing half of a bounded queue.
///
/// Clones share the same queue.
pub struct Consumer<T> {
    inner: Arc<BoundedQueue<T>>,
}

impl<T> Consumer<T> {
    /// Removes the oldest value, blocking while the queue is empty.
    #[inline]
    pub fn remove(&self) -> (T, Position) {
        self.inner.remove()
    }

    /// Attempts to remove a value without blocking.
    ///
    /// Returns `None` if the queue is empty.
    #[inline]
    pub fn try_remove(&self) -> Option<(T, Position)> {
        self.inner.try_remove()
    }

    /// Removes the oldest value, waiting at most `timeout` for one to arrive.
    #[inline]
    pub fn remove_timeout(&self, timeout: Duration) -> Option<(T, Position)> {
        self.inner.remove_timeout(timeout)
    }

    /// Returns `true` if the queue is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of items waiting to be removed.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns the capacity of the queue.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Returns the current occupancy state.
    #[inline(always)]
    pub fn state(&self) -> QueueState {
        self.inner.state()
    }

    /// Returns `(removed, inserted)` totals read under one lock acquisition.
    #[inline]
    pub fn counters(&self) -> (Position, Position) {
        self.inner.counters()
    }
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
