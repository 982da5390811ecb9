//! Synchronization utilities.

use std::fmt;

pub mod channel;
pub mod queue;

/// An error returned by [`queue::BoundedBlockingQueue::insert_now`] when the
/// queue is at capacity. Carries the value that wasn't inserted.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct CapacityExceeded<T>(pub T);

impl<T> CapacityExceeded<T> {
    /// Consume the error and return the value that wasn't inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for CapacityExceeded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "CapacityExceeded(..)".fmt(f)
    }
}

impl<T> fmt::Display for CapacityExceeded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "inserting into a full queue".fmt(f)
    }
}

impl<T> std::error::Error for CapacityExceeded<T> {}

/// An error that may be emitted by a bounded wait for room in the queue.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum InsertTimeoutError<T> {
    /// The deadline passed while the queue was still full.
    Timeout(T),
    /// The wait was aborted by [`queue::BoundedBlockingQueue::cancel_waiters`].
    Cancelled(T),
}

impl<T> InsertTimeoutError<T> {
    /// Consume the error and return the value that wasn't inserted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(value) | Self::Cancelled(value) => value,
        }
    }

    /// Returns true if the wait ended because its deadline passed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(..))
    }
}

impl<T> fmt::Debug for InsertTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InsertTimeoutError::Timeout(..) => "Timeout(..)".fmt(f),
            InsertTimeoutError::Cancelled(..) => "Cancelled(..)".fmt(f),
        }
    }
}

impl<T> fmt::Display for InsertTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertTimeoutError::Timeout(..) => "timed out waiting for room in the queue".fmt(f),
            InsertTimeoutError::Cancelled(..) => "wait for room in the queue was cancelled".fmt(f),
        }
    }
}

impl<T> std::error::Error for InsertTimeoutError<T> {}

/// An error that may be emitted by an unbounded wait for room in the queue.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum InsertError<T> {
    /// The wait was aborted by [`queue::BoundedBlockingQueue::cancel_waiters`].
    Cancelled(T),
}

impl<T> InsertError<T> {
    /// Consume the error and return the value that wasn't inserted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Cancelled(value) => value,
        }
    }
}

impl<T> fmt::Debug for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InsertError::Cancelled(..) => "Cancelled(..)".fmt(f),
        }
    }
}

impl<T> fmt::Display for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::Cancelled(..) => "wait for room in the queue was cancelled".fmt(f),
        }
    }
}

impl<T> std::error::Error for InsertError<T> {}

/// An error emitted when an element is required but the queue is empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EmptyQueue;

impl fmt::Display for EmptyQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the queue is empty".fmt(f)
    }
}

impl std::error::Error for EmptyQueue {}

/// An error emitted when a wait for an element is aborted by
/// [`queue::BoundedBlockingQueue::cancel_waiters`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "wait for an element was cancelled".fmt(f)
    }
}

impl std::error::Error for Cancelled {}
