//! A fixed-capacity, thread-safe blocking queue.
//!
//! Producers block while the queue is full, consumers block while it is
//! empty, and both resume as soon as the other side makes room or data.
//!
//! - [`BoundedQueue`] is the shared monitor itself.
//! - [`BoundedQueueChannel`] splits one queue into cloneable [`Producer`]
//!   and [`Consumer`] handles.
//! - [`harness`] drives a queue with randomized producer and consumer threads.

pub mod bounded;
pub mod error;
pub mod harness;
pub mod trace;

pub use bounded::{BoundedQueue, BoundedQueueChannel, Consumer, Position, Producer, QueueState};
pub use error::QueueError;
