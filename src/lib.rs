//! Bounded blocking queues.
//!
//! The core type is [`sync::queue::BoundedBlockingQueue`], a monitor-style
//! FIFO queue that parks producers while it is full and consumers while it is
//! empty. [`sync::channel::bounded`] wraps it in async `Sender`/`Receiver`
//! handles.
#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![forbid(unsafe_code)]

pub mod sync;
pub mod trace;
