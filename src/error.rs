use thiserror::Error;

/// Errors returned when constructing a [`BoundedQueue`](crate::BoundedQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A queue must have room for at least one item.
    #[error("bounded queue capacity must be greater than zero")]
    ZeroCapacity,
}
