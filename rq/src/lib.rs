//! ratequeue - priority request queue with rate-limited providers
//!
//! A shared [`PriorityQueue`] feeds any number of independent [`Provider`]
//! tasks. Each provider pops the most urgent request, emits one
//! [`ProcessedRecord`] for it and then waits out its own rate-limit interval.
//! The queue is the only state the providers share.
//!
//! # Ordering
//!
//! Requests are served by descending priority, then ascending arrival time,
//! then insertion order, so the dequeue order is fully deterministic.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ratequeue::{EventSink, PriorityQueue, Provider, ProviderConfig, RateLimit, Request};
//!
//! let queue = Arc::new(PriorityQueue::new());
//! let (sink, mut records) = EventSink::channel();
//! let handle = Provider::start(ProviderConfig::new("P1", RateLimit::new(2.0)?), queue.clone(), sink);
//!
//! queue.enqueue(Request::new(1, 3));
//! let record = records.recv().await;
//! handle.shutdown().await?;
//! ```
//!
//! # Modules
//!
//! - [`domain`] - request, id and priority value types
//! - [`queue`] - the shared priority queue
//! - [`provider`] - rate-limited consumer loops
//! - [`events`] - processed-request records
//! - [`dispatcher`] - end-to-end driver
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod events;
pub mod prompt;
pub mod provider;
pub mod queue;

// Re-export commonly used types
pub use config::Config;
pub use dispatcher::{DispatchConfig, DispatchError, DispatchSummary, Dispatcher};
pub use domain::{Priority, Request, RequestId};
pub use events::{EventSink, ProcessedRecord};
pub use provider::{
    Provider, ProviderConfig, ProviderError, ProviderHandle, ProviderReport, ProviderSpec, ProviderState, RateLimit,
};
pub use queue::{PriorityQueue, QueueStats};
