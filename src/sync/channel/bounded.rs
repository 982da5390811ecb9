use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_util::{future::poll_fn, Stream};

use crate::sync::{
    queue::{BoundedBlockingQueue, TaskWait},
    Cancelled, InsertError,
};

/// A task wait borrowed by a `send` or `recv` future. Dropping the future
/// while it is pending takes the task off the queue's wait list.
struct Parked<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
    wait: TaskWait,
}

impl<T> Drop for Parked<'_, T> {
    fn drop(&mut self) {
        self.queue.abandon(&mut self.wait);
    }
}

/// A handle to the channel which allows sending values.
pub struct Sender<T> {
    queue: Arc<BoundedBlockingQueue<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Sender<T> {
    /// Attempt to push a value onto the channel. Returns the value back if
    /// the channel is full.
    #[inline]
    pub fn try_send(&self, val: T) -> Result<(), T> {
        self.queue.insert_if_room(val)
    }

    /// Pushes a value onto the channel, waiting if the channel is full.
    ///
    /// Dropping the future before it completes drops the value without
    /// inserting it.
    pub async fn send(&self, val: T) -> Result<(), InsertError<T>> {
        let mut slot = Some(val);
        let mut parked = Parked {
            queue: &self.queue,
            wait: TaskWait::room(),
        };
        poll_fn(|cx| parked.queue.poll_insert(cx, &mut slot, &mut parked.wait)).await
    }

    /// Returns the queue shared by both ends of the channel, for use with
    /// the blocking API.
    pub fn handle(&self) -> &Arc<BoundedBlockingQueue<T>> {
        &self.queue
    }
}

/// A handle to the channel which allows receiving values.
pub struct Receiver<T> {
    queue: Arc<BoundedBlockingQueue<T>>,
    // The `Stream` wait in progress, if any.
    stream_wait: TaskWait,
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.queue.abandon(&mut self.stream_wait);
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            stream_wait: TaskWait::item(),
        }
    }
}

impl<T> Receiver<T> {
    /// Attempt to receive a value from the channel. Returns `None` if the
    /// channel is empty.
    #[inline]
    pub fn try_recv(&self) -> Option<T> {
        self.queue.remove_now()
    }

    /// Receives a value from the channel, waiting if the channel is empty.
    pub async fn recv(&self) -> Result<T, Cancelled> {
        let mut parked = Parked {
            queue: &self.queue,
            wait: TaskWait::item(),
        };
        poll_fn(|cx| parked.queue.poll_remove(cx, &mut parked.wait)).await
    }

    /// Returns the queue shared by both ends of the channel, for use with
    /// the blocking API.
    pub fn handle(&self) -> &Arc<BoundedBlockingQueue<T>> {
        &self.queue
    }
}

impl<T> Stream for Receiver<T> {
    type Item = Result<T, Cancelled>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.queue.poll_remove(cx, &mut this.stream_wait).map(Some)
    }
}

/// Creates a channel that buffers at most `capacity` values.
///
/// Both ends can be cloned; every handle shares the same queue.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let queue = Arc::new(BoundedBlockingQueue::with_capacity(capacity));
    (
        Sender {
            queue: queue.clone(),
        },
        Receiver {
            queue,
            stream_wait: TaskWait::item(),
        },
    )
}
