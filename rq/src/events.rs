//! Processed-request records
//!
//! Every request a provider handles produces exactly one [`ProcessedRecord`].
//! Records travel over an unbounded channel so none are ever dropped; the
//! driver decides how to render them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::{Priority, Request, RequestId};

/// One processed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub request_id: RequestId,
    pub priority: Priority,
}

impl ProcessedRecord {
    /// Record that `provider` is processing `request` now
    pub fn now(provider: &str, request: &Request) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.to_string(),
            request_id: request.id(),
            priority: request.priority(),
        }
    }
}

impl std::fmt::Display for ProcessedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} processing Request(id={}, priority={})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.provider,
            self.request_id,
            self.priority
        )
    }
}

/// Sending half handed to each provider
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ProcessedRecord>>,
}

impl EventSink {
    /// Create a sink and the receiver that observes it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProcessedRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink nobody listens to; records are only logged
    pub fn discard() -> Self {
        Self { tx: None }
    }

    /// Deliver a record
    pub fn emit(&self, record: ProcessedRecord) {
        debug!(provider = %record.provider, request_id = %record.request_id, "EventSink::emit");
        if let Some(tx) = &self.tx
            && tx.send(record).is_err()
        {
            warn!("EventSink: receiver closed, record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let request = Request::new(4, 3);
        let record = ProcessedRecord::now("P1", &request);
        let line = record.to_string();

        assert!(line.starts_with('['));
        assert!(line.ends_with("P1 processing Request(id=4, priority=3)"));
    }

    #[test]
    fn test_record_serde() {
        let record = ProcessedRecord::now("P2", &Request::new(7, 1));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"provider\":\"P2\""));
        assert!(json.contains("\"request_id\":7"));

        let back: ProcessedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(ProcessedRecord::now("P1", &Request::new(1, 1)));
        sink.emit(ProcessedRecord::now("P1", &Request::new(2, 1)));
        drop(sink);

        assert_eq!(rx.recv().await.map(|r| r.request_id.get()), Some(1));
        assert_eq!(rx.recv().await.map(|r| r.request_id.get()), Some(2));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_discard_sink_accepts_records() {
        EventSink::discard().emit(ProcessedRecord::now("P1", &Request::new(1, 1)));
    }
}
