//! Domain types for ratequeue
//!
//! A [`Request`] is the single unit of work: an id, a [`Priority`] and a
//! monotonic arrival time.

mod priority;
mod request;

pub use priority::Priority;
pub use request::{Request, RequestId};
