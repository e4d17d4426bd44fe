//! Rate-limited providers
//!
//! A provider is a long-running task bound to a name and a rate limit. It
//! repeatedly pops the most urgent request from the shared queue, emits one
//! record for it, then sleeps `1 / rate` before trying again. An empty queue
//! costs a fixed backoff instead.

mod config;
mod core;
mod error;
mod handle;

pub use config::{DEFAULT_BACKOFF, DEFAULT_RATE_LIMIT, ProviderConfig, ProviderSpec, RateLimit};
pub use core::Provider;
pub use error::ProviderError;
pub use handle::{ProviderHandle, ProviderReport, ProviderState};
