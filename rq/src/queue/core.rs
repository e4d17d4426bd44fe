//! PriorityQueue implementation

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::{Priority, Request};

use super::entry::{QueuedRequest, QueueStats};

/// Internal state protected by mutex
#[derive(Default)]
struct QueueInner {
    /// Pending requests, most urgent at the front
    entries: VecDeque<QueuedRequest>,

    /// Next insertion sequence number
    next_seq: u64,

    /// Statistics
    stats: QueueStats,
}

/// Thread-safe priority queue of pending requests.
///
/// Every operation runs under one mutex and never waits on anything else
/// while holding it, so enqueue and dequeue are linearizable and callable
/// from any thread or async task.
#[derive(Default)]
pub struct PriorityQueue {
    inner: Mutex<QueueInner>,
}

impl PriorityQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations are a single insert or pop_front, so the sequence is
    // consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a request at its sorted position
    pub fn enqueue(&self, request: Request) {
        let mut inner = self.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let entry = QueuedRequest { seq, request };

        // First position whose occupant is served after the new entry
        let index = inner
            .entries
            .partition_point(|queued| queued.service_order(&entry) == Ordering::Less);

        debug!(
            id = %entry.request.id(),
            priority = %entry.request.priority(),
            index,
            "PriorityQueue::enqueue"
        );
        inner.entries.insert(index, entry);

        inner.stats.total_enqueued += 1;
        inner.stats.peak_depth = inner.stats.peak_depth.max(inner.entries.len());
    }

    /// Remove and return the most urgent request, or `None` when empty.
    ///
    /// Never waits for work to arrive.
    pub fn dequeue(&self) -> Option<Request> {
        let mut inner = self.lock();
        let entry = inner.entries.pop_front()?;
        inner.stats.total_dequeued += 1;
        debug!(id = %entry.request.id(), priority = %entry.request.priority(), "PriorityQueue::dequeue");
        Some(entry.request)
    }

    /// Snapshot check; may be stale as soon as it returns
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Snapshot of the number of pending requests
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Priority of the current head, if any
    pub fn peek_priority(&self) -> Option<Priority> {
        self.lock().entries.front().map(|queued| queued.request.priority())
    }

    /// Remove every pending request in service order under one lock
    pub fn drain(&self) -> Vec<Request> {
        let mut inner = self.lock();
        let drained: Vec<Request> = inner.entries.drain(..).map(|queued| queued.request).collect();
        inner.stats.total_dequeued += drained.len() as u64;
        debug!(count = drained.len(), "PriorityQueue::drain");
        drained
    }

    /// Get the queue statistics
    pub fn stats(&self) -> QueueStats {
        self.lock().stats.clone()
    }
}
