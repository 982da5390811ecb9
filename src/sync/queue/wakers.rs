use std::task::Waker;

/// Async tasks parked on one side of a queue, waiting for room or for an item.
///
/// Each parked task holds the key of its entry and removes it when its wait
/// completes or is dropped, so the list only ever holds live waits. Only
/// touched while the queue lock is held.
#[derive(Debug, Default)]
pub(crate) struct WakerList {
    wakers: Vec<(u64, Waker)>,
    next_key: u64,
}

impl WakerList {
    /// Parks the task behind `waker`. A task that is still registered under
    /// `key` has its waker refreshed instead; otherwise a new key is stored
    /// in `key`.
    pub(crate) fn register(&mut self, key: &mut Option<u64>, waker: &Waker) {
        if let Some(key) = *key {
            if let Some((_, parked)) = self.wakers.iter_mut().find(|(k, _)| *k == key) {
                if !parked.will_wake(waker) {
                    parked.clone_from(waker);
                }
                return;
            }
        }
        let new_key = self.next_key;
        self.next_key = self.next_key.wrapping_add(1);
        self.wakers.push((new_key, waker.clone()));
        *key = Some(new_key);
    }

    /// Removes the entry registered under `key`, if it is still parked.
    pub(crate) fn remove(&mut self, key: &mut Option<u64>) {
        if let Some(key) = key.take() {
            if let Some(index) = self.wakers.iter().position(|(k, _)| *k == key) {
                self.wakers.swap_remove(index);
            }
        }
    }

    /// Returns true if a task is parked under `key`.
    pub(crate) fn contains(&self, key: u64) -> bool {
        self.wakers.iter().any(|(k, _)| *k == key)
    }

    /// Removes every parked task. A task woken this way registers again if
    /// it still has to wait.
    pub(crate) fn take(&mut self) -> Vec<Waker> {
        self.wakers.drain(..).map(|(_, waker)| waker).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.wakers.len()
    }
}

/// Wakers collected inside a critical section, woken on drop.
///
/// Declare it before the lock guard: locals drop in reverse order, so the
/// wakers run after the lock has been released and a waker that polls inline
/// cannot deadlock on it.
#[derive(Default)]
pub(crate) struct Wakeups {
    wakers: Vec<Waker>,
}

impl Wakeups {
    pub(crate) fn extend(&mut self, wakers: Vec<Waker>) {
        if self.wakers.is_empty() {
            self.wakers = wakers;
        } else {
            self.wakers.extend(wakers);
        }
    }
}

impl Drop for Wakeups {
    fn drop(&mut self) {
        for waker in self.wakers.drain(..) {
            waker.wake();
        }
    }
}
