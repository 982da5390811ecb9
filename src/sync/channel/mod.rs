//! Async channels built on the blocking queues.
//!
//! Both ends interoperate with threads using the blocking API through
//! `handle()`: a task parked in `send` is woken by a thread's removal and
//! vice versa.

pub use self::bounded::{bounded, Receiver, Sender};

mod bounded;
