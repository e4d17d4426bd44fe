//! The unit of work carried through the queue

use std::cmp::Ordering;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::Priority;

/// Externally assigned request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending outbound request.
///
/// Immutable once built. Not `Clone`: a request is owned by exactly one
/// holder at a time (the producer, the queue, or the provider that popped it).
#[derive(Debug, PartialEq, Eq)]
pub struct Request {
    id: RequestId,
    priority: Priority,
    received_at: Instant,
}

impl Request {
    /// Create a request stamped with the current monotonic time
    pub fn new(id: impl Into<RequestId>, priority: impl Into<Priority>) -> Self {
        Self::with_received_at(id, priority, Instant::now())
    }

    /// Create a request with an explicit arrival time
    pub fn with_received_at(id: impl Into<RequestId>, priority: impl Into<Priority>, received_at: Instant) -> Self {
        Self {
            id: id.into(),
            priority: priority.into(),
            received_at,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Service order: `Less` means `self` is served before `other`.
    ///
    /// Higher priority first, then earlier arrival. Requests that tie on both
    /// compare `Equal`; the queue breaks that tie by insertion order.
    pub fn service_order(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.received_at.cmp(&other.received_at))
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Request(id={}, priority={})", self.id, self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_higher_priority_served_first() {
        let t0 = Instant::now();
        let low = Request::with_received_at(1, 1, t0);
        let high = Request::with_received_at(2, 3, t0 + Duration::from_secs(5));

        assert_eq!(high.service_order(&low), Ordering::Less);
        assert_eq!(low.service_order(&high), Ordering::Greater);
    }

    #[test]
    fn test_same_priority_fifo() {
        let t0 = Instant::now();
        let first = Request::with_received_at(1, 2, t0);
        let second = Request::with_received_at(2, 2, t0 + Duration::from_millis(1));

        assert_eq!(first.service_order(&second), Ordering::Less);
        assert_eq!(second.service_order(&first), Ordering::Greater);
    }

    #[test]
    fn test_full_tie_is_equal() {
        let t0 = Instant::now();
        let a = Request::with_received_at(1, 2, t0);
        let b = Request::with_received_at(2, 2, t0);

        assert_eq!(a.service_order(&b), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        let request = Request::new(42, 3);
        assert_eq!(request.to_string(), "Request(id=42, priority=3)");
        assert_eq!(request.id(), RequestId::new(42));
        assert_eq!(request.priority(), Priority::new(3));
    }
}
