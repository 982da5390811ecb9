//! Queues shared between threads.

pub use self::blocking::BoundedBlockingQueue;
pub(crate) use self::blocking::TaskWait;

mod blocking;
mod wakers;
