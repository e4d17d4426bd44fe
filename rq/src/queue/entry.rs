//! Queue entry and statistics types

use std::cmp::Ordering;

use crate::domain::Request;

/// A request as stored in the queue, tagged with its insertion sequence
#[derive(Debug)]
pub(crate) struct QueuedRequest {
    pub seq: u64,
    pub request: Request,
}

impl QueuedRequest {
    /// Total service order: `Less` is served first.
    ///
    /// Sequence numbers are unique per queue, so two distinct entries never
    /// compare `Equal`.
    pub fn service_order(&self, other: &Self) -> Ordering {
        self.request
            .service_order(&other.request)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Counters for a queue's lifetime
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    pub peak_depth: usize,
}

impl QueueStats {
    /// Requests currently pending according to the counters
    pub fn pending(&self) -> u64 {
        self.total_enqueued - self.total_dequeued
    }
}
