use crate::error::QueueError;
use crate::trace::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Logical position of an item: the value of the insert (or remove) counter
/// at the moment the item entered (or left) the queue.
///
/// Positions grow monotonically for the lifetime of the queue. Only
/// `position % capacity` is used to address a slot.
pub type Position = u64;

/// Occupancy of a [`BoundedQueue`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// `head == tail`: removers block.
    Empty,
    /// Some items stored, some slots free.
    Partial,
    /// `tail - head == capacity`: inserters block.
    Full,
}

/// A fixed-capacity, thread-safe blocking queue.
///
/// # Overview
///
/// `BoundedQueue` is a monitor: a circular buffer guarded by one [`Mutex`]
/// and two [`Condvar`]s. Inserters wait on `item_removed` while the buffer
/// is full, removers wait on `item_added` while it is empty. Each
/// successful insert wakes one waiting remover and each successful remove
/// wakes one waiting inserter, so a wake-up never goes to a thread of the
/// same role.
///
/// # Ordering
///
/// Every operation runs under the lock, so all inserts and removes are
/// linearized. The i-th successful remove returns the i-th inserted item.
///
/// # Fairness
///
/// When several threads are blocked in the same role, which one is woken
/// is left to the underlying wait queue. No FIFO wake order is promised.
///
/// # Counters
///
/// `head` and `tail` only ever advance. `tail - head` is the number of
/// stored items and always lies in `0..=capacity`.
///
/// # Example
///
/// ```
/// use bbq::BoundedQueue;
///
/// let queue = BoundedQueue::new(2).unwrap();
/// assert_eq!(queue.insert("a"), 0);
/// assert_eq!(queue.insert("b"), 1);
/// assert_eq!(queue.remove(), ("a", 0));
/// ```
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    item_added: Condvar,
    item_removed: Condvar,
}

/// Slot storage plus the two logical counters. Only reachable through the lock.
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: Position,
    tail: Position,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
        }
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn len(&self) -> usize {
        (self.tail - self.head) as usize
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.tail == self.head
    }

    #[inline(always)]
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline(always)]
    fn slot(&self, position: Position) -> usize {
        (position % self.capacity() as u64) as usize
    }

    fn state(&self) -> QueueState {
        if self.is_empty() {
            QueueState::Empty
        } else if self.is_full() {
            QueueState::Full
        } else {
            QueueState::Partial
        }
    }

    /// Stores `value` at `tail` and advances it, or hands the value back if full.
    fn push(&mut self, value: T) -> Result<Position, T> {
        if self.is_full() {
            return Err(value);
        }
        let position = self.tail;
        let slot = self.slot(position);
        self.slots[slot] = Some(value);
        self.tail += 1;
        Ok(position)
    }

    /// Takes the value at `head` and advances it, or `None` if empty.
    ///
    /// # Panics
    ///
    /// Panics if the slot at `head` is empty while `tail > head`. The queue
    /// state is corrupted in that case and cannot be recovered.
    fn pop(&mut self) -> Option<(T, Position)> {
        if self.is_empty() {
            return None;
        }
        let position = self.head;
        let slot = self.slot(position);
        let value = self.slots[slot]
            .take()
            .expect("slot at head is occupied while tail > head");
        self.head += 1;
        Some((value, position))
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// Returns [`QueueError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        debug!(capacity, "bounded queue created");
        Ok(Self {
            ring: Mutex::new(Ring::new(capacity)),
            item_added: Condvar::new(),
            item_removed: Condvar::new(),
        })
    }

    /// Inserts `value`, blocking while the queue is full.
    ///
    /// Returns the logical position the item was stored at. Wakes at most
    /// one thread blocked in [`remove`](Self::remove).
    pub fn insert(&self, value: T) -> Position {
        let mut ring = self.ring.lock();
        let mut value = value;
        loop {
            match ring.push(value) {
                Ok(position) => {
                    self.item_added.notify_one();
                    return position;
                }
                Err(rejected) => value = rejected,
            }
            trace!(tail = ring.tail, "insert blocked on full queue");
            self.item_removed.wait(&mut ring);
        }
    }

    /// Removes the oldest item, blocking while the queue is empty.
    ///
    /// Returns the item and the logical position it was removed from. Wakes
    /// at most one thread blocked in [`insert`](Self::insert).
    pub fn remove(&self) -> (T, Position) {
        let mut ring = self.ring.lock();
        loop {
            if let Some(removed) = ring.pop() {
                self.item_removed.notify_one();
                return removed;
            }
            trace!(head = ring.head, "remove blocked on empty queue");
            self.item_added.wait(&mut ring);
        }
    }

    /// Inserts `value` only if a slot is free right now.
    ///
    /// Returns `Err(value)` if the queue is full.
    pub fn try_insert(&self, value: T) -> Result<Position, T> {
        let position = self.ring.lock().push(value)?;
        self.item_added.notify_one();
        Ok(position)
    }

    /// Removes the oldest item only if one is stored right now.
    pub fn try_remove(&self) -> Option<(T, Position)> {
        let removed = self.ring.lock().pop()?;
        self.item_removed.notify_one();
        Some(removed)
    }

    /// Like [`insert`](Self::insert) but gives up after `timeout`.
    ///
    /// Returns `Err(value)` if the queue stayed full for the whole timeout.
    pub fn insert_timeout(&self, value: T, timeout: Duration) -> Result<Position, T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut ring = self.ring.lock();
        let mut value = value;
        loop {
            match ring.push(value) {
                Ok(position) => {
                    self.item_added.notify_one();
                    return Ok(position);
                }
                Err(rejected) => value = rejected,
            }
            match deadline {
                Some(deadline) => {
                    if self.item_removed.wait_until(&mut ring, deadline).timed_out() && ring.is_full() {
                        trace!(tail = ring.tail, "insert timed out on full queue");
                        return Err(value);
                    }
                }
                None => self.item_removed.wait(&mut ring),
            }
        }
    }

    /// Like [`remove`](Self::remove) but gives up after `timeout`.
    ///
    /// Returns `None` if the queue stayed empty for the whole timeout.
    pub fn remove_timeout(&self, timeout: Duration) -> Option<(T, Position)> {
        let deadline = Instant::now().checked_add(timeout);
        let mut ring = self.ring.lock();
        loop {
            if let Some(removed) = ring.pop() {
                self.item_removed.notify_one();
                return Some(removed);
            }
            match deadline {
                Some(deadline) => {
                    if self.item_added.wait_until(&mut ring, deadline).timed_out() && ring.is_empty() {
                        trace!(head = ring.head, "remove timed out on empty queue");
                        return None;
                    }
                }
                None => self.item_added.wait(&mut ring),
            }
        }
    }

    /// Returns the fixed capacity of the queue.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Returns the number of items currently stored.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Returns `true` if no items are stored.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// Returns `true` if every slot is occupied.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.ring.lock().is_full()
    }

    /// Returns the current [`QueueState`].
    pub fn state(&self) -> QueueState {
        self.ring.lock().state()
    }

    /// Returns `(head, tail)`, i.e. the total number of items removed and
    /// inserted so far, read under a single lock acquisition.
    pub fn counters(&self) -> (Position, Position) {
        let ring = self.ring.lock();
        (ring.head, ring.tail)
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &ring.capacity())
            .field("head", &ring.head)
            .field("tail", &ring.tail)
            .finish()
    }
}
