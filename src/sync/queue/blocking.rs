//! A bounded multi-producer, multi-consumer blocking queue.

use std::{
    collections::VecDeque,
    fmt,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::wakers::{WakerList, Wakeups};
use crate::{
    sync::{CapacityExceeded, Cancelled, EmptyQueue, InsertError, InsertTimeoutError},
    trace::{debug, trace},
};

/// The two wait-sets of the queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    /// Producers waiting for a free slot.
    Room,
    /// Consumers waiting for an element.
    Item,
}

/// Why a thread stopped waiting before the queue was ready for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Interrupted {
    TimedOut,
    Cancelled,
}

/// An async task's wait on one side of a queue.
///
/// Holds the task's waker registration and the cancellation epoch it entered
/// with. Whoever owns it must hand it to `BoundedBlockingQueue::abandon` if
/// the wait is dropped while pending.
#[derive(Debug)]
pub(crate) struct TaskWait {
    side: Side,
    key: Option<u64>,
    epoch: Option<u64>,
}

impl TaskWait {
    /// A wait for room, driven by `poll_insert`.
    pub(crate) fn room() -> Self {
        Self {
            side: Side::Room,
            key: None,
            epoch: None,
        }
    }

    /// A wait for an element, driven by `poll_remove`.
    pub(crate) fn item() -> Self {
        Self {
            side: Side::Item,
            key: None,
            epoch: None,
        }
    }
}

/// State guarded by the queue lock.
struct State<E> {
    items: VecDeque<E>,
    /// Bumped by `cancel_waiters`. A waiter that sees a different value than
    /// the one it entered with has been cancelled.
    epoch: u64,
    producers: WakerList,
    consumers: WakerList,
}

/// A bounded FIFO queue that blocks producers while it is full and consumers
/// while it is empty.
///
/// All state lives behind a single lock. Producers park on a "room available"
/// condition and consumers on an "item available" condition; every insertion
/// wakes one consumer and every removal wakes one producer. A woken waiter
/// always re-checks the queue before acting, so spurious wakeups and races
/// with immediate operations are harmless. No promise is made about which
/// waiter is woken.
///
/// Every operation comes in the flavours the caller needs: immediate
/// (`insert_now`, `remove_required`), best-effort (`insert_if_room`,
/// `remove_now`), bounded (`insert_wait`, `remove_wait`) and unbounded
/// (`insert_block`, `remove_block`).
///
/// # Examples
///
/// ```
/// use std::{sync::Arc, thread};
///
/// use blockq::sync::queue::BoundedBlockingQueue;
///
/// let queue = Arc::new(BoundedBlockingQueue::with_capacity(2));
/// let producer = {
///     let queue = queue.clone();
///     thread::spawn(move || {
///         for i in 0..10 {
///             queue.insert_block(i).unwrap();
///         }
///     })
/// };
/// for i in 0..10 {
///     assert_eq!(Ok(i), queue.remove_block());
/// }
/// producer.join().unwrap();
/// ```
pub struct BoundedBlockingQueue<E> {
    state: Mutex<State<E>>,
    room_available: Condvar,
    item_available: Condvar,
    capacity: usize,
}

impl<E> BoundedBlockingQueue<E> {
    /// Creates a queue with no practical capacity limit (`usize::MAX`).
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Creates a queue that holds at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be greater than 0");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity.min(1024)),
                epoch: 0,
                producers: WakerList::default(),
                consumers: WakerList::default(),
            }),
            room_available: Condvar::new(),
            item_available: Condvar::new(),
            capacity,
        }
    }

    /// Inserts `value` if there is room, failing immediately otherwise.
    ///
    /// The error hands `value` back.
    pub fn insert_now(&self, value: E) -> Result<(), CapacityExceeded<E>> {
        self.insert_if_room(value).map_err(CapacityExceeded)
    }

    /// Inserts `value` if there is room. Returns `Err(value)` if the queue is
    /// full; that is an expected outcome rather than a failure.
    pub fn insert_if_room(&self, value: E) -> Result<(), E> {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        if !self.is_ready(&state, Side::Room) {
            return Err(value);
        }
        self.push(&mut state, value, &mut wakeups);
        Ok(())
    }

    /// Inserts `value`, waiting up to `timeout` for room to become available.
    ///
    /// The deadline is fixed when the call starts, so spurious wakeups do not
    /// extend the total wait.
    pub fn insert_wait(&self, value: E, timeout: Duration) -> Result<(), InsertTimeoutError<E>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        match self.wait(&mut state, Side::Room, deadline, &mut wakeups) {
            Ok(()) => {
                self.push(&mut state, value, &mut wakeups);
                Ok(())
            }
            Err(Interrupted::TimedOut) => Err(InsertTimeoutError::Timeout(value)),
            Err(Interrupted::Cancelled) => Err(InsertTimeoutError::Cancelled(value)),
        }
    }

    /// Inserts `value`, waiting for as long as it takes for room to become
    /// available.
    pub fn insert_block(&self, value: E) -> Result<(), InsertError<E>> {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        match self.wait(&mut state, Side::Room, None, &mut wakeups) {
            Ok(()) => {
                self.push(&mut state, value, &mut wakeups);
                Ok(())
            }
            Err(_) => Err(InsertError::Cancelled(value)),
        }
    }

    /// Removes and returns the head of the queue, or `None` if it is empty.
    pub fn remove_now(&self) -> Option<E> {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        self.pop(&mut state, &mut wakeups)
    }

    /// Removes and returns the head of the queue, failing if it is empty.
    pub fn remove_required(&self) -> Result<E, EmptyQueue> {
        self.remove_now().ok_or(EmptyQueue)
    }

    /// Removes the head of the queue, waiting up to `timeout` for an element.
    /// Returns `Ok(None)` if the deadline passes first.
    pub fn remove_wait(&self, timeout: Duration) -> Result<Option<E>, Cancelled> {
        let deadline = Instant::now().checked_add(timeout);
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        match self.wait_pop(&mut state, deadline, &mut wakeups) {
            Ok(value) => Ok(Some(value)),
            Err(Interrupted::TimedOut) => Ok(None),
            Err(Interrupted::Cancelled) => Err(Cancelled),
        }
    }

    /// Removes the head of the queue, waiting for as long as it takes for an
    /// element to arrive.
    pub fn remove_block(&self) -> Result<E, Cancelled> {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        self.wait_pop(&mut state, None, &mut wakeups).map_err(|_| Cancelled)
    }

    /// Removes the first element equal to `value`. Returns false if there is
    /// none. The relative order of the other elements is preserved.
    pub fn remove_value(&self, value: &E) -> bool
    where
        E: PartialEq,
    {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        let Some(index) = state.items.iter().position(|item| item == value) else {
            return false;
        };
        state.items.remove(index);
        self.signal(&mut state, Side::Room, &mut wakeups);
        true
    }

    /// Returns a copy of the head of the queue, or `None` if it is empty.
    pub fn peek(&self) -> Option<E>
    where
        E: Clone,
    {
        self.state.lock().items.front().cloned()
    }

    /// Returns a copy of the head of the queue, failing if it is empty.
    pub fn require_head(&self) -> Result<E, EmptyQueue>
    where
        E: Clone,
    {
        self.peek().ok_or(EmptyQueue)
    }

    /// Aborts every wait, by threads or async tasks, that is parked when this
    /// is called. Aborted insertions hand their element back.
    ///
    /// Waits that start afterwards are not affected.
    pub fn cancel_waiters(&self) {
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        state.epoch = state.epoch.wrapping_add(1);
        debug!(epoch = state.epoch, "cancelling parked waiters");
        self.room_available.notify_all();
        self.item_available.notify_all();
        let producers = state.producers.take();
        let consumers = state.consumers.take();
        wakeups.extend(producers);
        wakeups.extend(consumers);
    }

    /// Returns the number of elements in the queue.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns true if the queue holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the queue is at capacity.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Returns the maximum number of elements the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many more elements fit in the queue right now.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.len()
    }

    /// Async counterpart of `insert_block`. `slot` holds the value until it
    /// is inserted.
    pub(crate) fn poll_insert(
        &self,
        cx: &mut Context<'_>,
        slot: &mut Option<E>,
        wait: &mut TaskWait,
    ) -> Poll<Result<(), InsertError<E>>> {
        debug_assert_eq!(Side::Room, wait.side);
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        if *wait.epoch.get_or_insert(state.epoch) != state.epoch {
            self.settle(&mut state, wait);
            self.forward(&mut state, Side::Room, &mut wakeups);
            return Poll::Ready(slot.take().map_or(Ok(()), |v| Err(InsertError::Cancelled(v))));
        }
        if !self.is_ready(&state, Side::Room) {
            state.producers.register(&mut wait.key, cx.waker());
            return Poll::Pending;
        }
        self.settle(&mut state, wait);
        if let Some(value) = slot.take() {
            self.push(&mut state, value, &mut wakeups);
        }
        Poll::Ready(Ok(()))
    }

    /// Async counterpart of `remove_block`.
    pub(crate) fn poll_remove(
        &self,
        cx: &mut Context<'_>,
        wait: &mut TaskWait,
    ) -> Poll<Result<E, Cancelled>> {
        debug_assert_eq!(Side::Item, wait.side);
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        if *wait.epoch.get_or_insert(state.epoch) != state.epoch {
            self.settle(&mut state, wait);
            self.forward(&mut state, Side::Item, &mut wakeups);
            return Poll::Ready(Err(Cancelled));
        }
        match self.pop(&mut state, &mut wakeups) {
            Some(value) => {
                self.settle(&mut state, wait);
                Poll::Ready(Ok(value))
            }
            None => {
                state.consumers.register(&mut wait.key, cx.waker());
                Poll::Pending
            }
        }
    }

    /// Drops the registration of a task wait that will not be polled to
    /// completion. If the task had already been woken, the wakeup is passed
    /// on to another waiter.
    pub(crate) fn abandon(&self, wait: &mut TaskWait) {
        if wait.epoch.is_none() {
            return;
        }
        let mut wakeups = Wakeups::default();
        let mut state = self.state.lock();
        // A missing entry means a signal drained it and woke this task.
        let woken = wait.key.is_some() && !self.is_registered(&state, wait);
        self.settle(&mut state, wait);
        if woken {
            self.forward(&mut state, wait.side, &mut wakeups);
        }
    }

    /// Ends a task wait: removes its waker and forgets its epoch, so the
    /// same `TaskWait` can start a fresh wait.
    fn settle(&self, state: &mut State<E>, wait: &mut TaskWait) {
        match wait.side {
            Side::Room => state.producers.remove(&mut wait.key),
            Side::Item => state.consumers.remove(&mut wait.key),
        }
        wait.epoch = None;
    }

    fn is_registered(&self, state: &State<E>, wait: &TaskWait) -> bool {
        let Some(key) = wait.key else {
            return false;
        };
        match wait.side {
            Side::Room => state.producers.contains(key),
            Side::Item => state.consumers.contains(key),
        }
    }

    /// Number of async tasks parked for room and for an element.
    #[cfg(test)]
    pub(crate) fn parked_tasks(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.producers.len(), state.consumers.len())
    }

    fn is_ready(&self, state: &State<E>, side: Side) -> bool {
        match side {
            Side::Room => state.items.len() < self.capacity,
            Side::Item => !state.items.is_empty(),
        }
    }

    fn condvar(&self, side: Side) -> &Condvar {
        match side {
            Side::Room => &self.room_available,
            Side::Item => &self.item_available,
        }
    }

    /// Appends `value` and wakes one consumer. The caller checked for room.
    fn push(&self, state: &mut State<E>, value: E, wakeups: &mut Wakeups) {
        debug_assert!(state.items.len() < self.capacity);
        state.items.push_back(value);
        self.signal(state, Side::Item, wakeups);
    }

    /// Takes the head and, if there was one, wakes one producer.
    fn pop(&self, state: &mut State<E>, wakeups: &mut Wakeups) -> Option<E> {
        let value = state.items.pop_front()?;
        self.signal(state, Side::Room, wakeups);
        Some(value)
    }

    /// Wakes one waiter on `side`. Parked threads are preferred; if there are
    /// none, every parked task on that side is woken.
    fn signal(&self, state: &mut State<E>, side: Side, wakeups: &mut Wakeups) {
        if self.condvar(side).notify_one() {
            return;
        }
        let tasks = match side {
            Side::Room => state.producers.take(),
            Side::Item => state.consumers.take(),
        };
        wakeups.extend(tasks);
    }

    /// Passes on a wakeup that a departing waiter may have consumed.
    fn forward(&self, state: &mut State<E>, side: Side, wakeups: &mut Wakeups) {
        if self.is_ready(state, side) {
            self.signal(state, side, wakeups);
        }
    }

    /// Parks the calling thread on `side` until the queue is ready for it,
    /// `deadline` passes, or `cancel_waiters` is called. The lock is released
    /// while parked and held again on return; `Ok` means the guarded state
    /// is ready for `side` right now.
    fn wait(
        &self,
        state: &mut MutexGuard<'_, State<E>>,
        side: Side,
        deadline: Option<Instant>,
        wakeups: &mut Wakeups,
    ) -> Result<(), Interrupted> {
        let epoch = state.epoch;
        loop {
            if state.epoch != epoch {
                trace!(?side, "wait cancelled");
                self.forward(state, side, wakeups);
                return Err(Interrupted::Cancelled);
            }
            if self.is_ready(state, side) {
                return Ok(());
            }
            match deadline {
                None => {
                    trace!(?side, "parking");
                    self.condvar(side).wait(state);
                }
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        trace!(?side, "wait timed out");
                        return Err(Interrupted::TimedOut);
                    }
                    trace!(?side, "parking until deadline");
                    // The outcome is re-derived from the state on the next
                    // iteration; a timeout that races a signal still succeeds.
                    let _ = self.condvar(side).wait_until(state, deadline);
                }
            }
        }
    }

    /// Waits for an element and takes it.
    fn wait_pop(
        &self,
        state: &mut MutexGuard<'_, State<E>>,
        deadline: Option<Instant>,
        wakeups: &mut Wakeups,
    ) -> Result<E, Interrupted> {
        loop {
            self.wait(state, Side::Item, deadline, wakeups)?;
            // `wait` returned holding the lock with an element queued.
            if let Some(value) = self.pop(state, wakeups) {
                return Ok(value);
            }
        }
    }
}

impl<E> Default for BoundedBlockingQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for BoundedBlockingQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBlockingQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
