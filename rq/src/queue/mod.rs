//! Shared priority queue
//!
//! The single synchronization point between producers and providers.
//! Requests are served by descending priority, then by arrival time, then by
//! insertion order.

mod core;
mod entry;

pub use core::PriorityQueue;
pub use entry::QueueStats;
