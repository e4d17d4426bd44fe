//! Provider loop implementation

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::domain::Request;
use crate::events::{EventSink, ProcessedRecord};
use crate::queue::PriorityQueue;

use super::config::{DEFAULT_BACKOFF, ProviderConfig};
use super::handle::{ProviderHandle, ProviderReport, ProviderState};

/// A consumer that drains the shared queue at no more than its rate limit.
///
/// Each provider runs in its own tokio task and shares nothing with other
/// providers except the queue.
pub struct Provider {
    config: ProviderConfig,
    queue: Arc<PriorityQueue>,
    sink: EventSink,
    backoff: Duration,
    state_tx: watch::Sender<ProviderState>,
    shutdown_rx: mpsc::Receiver<()>,
    processed: u64,
}

impl Provider {
    /// Spawn a provider with the default empty-queue backoff.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ProviderConfig, queue: Arc<PriorityQueue>, sink: EventSink) -> ProviderHandle {
        Self::start_with_backoff(config, queue, sink, DEFAULT_BACKOFF)
    }

    /// Spawn a provider that waits `backoff` after finding the queue empty
    pub fn start_with_backoff(
        config: ProviderConfig,
        queue: Arc<PriorityQueue>,
        sink: EventSink,
        backoff: Duration,
    ) -> ProviderHandle {
        debug!(name = %config.name, rate_limit = %config.rate_limit, ?backoff, "Provider::start: called");
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(ProviderState::Polling);
        let name = config.name.clone();

        let provider = Self {
            config,
            queue,
            sink,
            backoff,
            state_tx,
            shutdown_rx,
            processed: 0,
        };

        let task = tokio::spawn(provider.run());
        ProviderHandle::new(name, shutdown_tx, state_rx, task)
    }

    async fn run(mut self) -> ProviderReport {
        info!(
            provider = %self.config.name,
            rate_limit = %self.config.rate_limit,
            "Provider starting"
        );

        while !self.shutdown_requested() {
            let pause = match self.queue.dequeue() {
                Some(request) => {
                    self.process(request);
                    self.config.rate_limit.interval()
                }
                None => {
                    self.set_state(ProviderState::Polling);
                    self.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.shutdown_rx.recv() => {
                    debug!(provider = %self.config.name, "Provider::run: shutdown during sleep");
                    break;
                }
            }
        }

        self.set_state(ProviderState::Polling);
        info!(provider = %self.config.name, processed = self.processed, "Provider stopped");

        ProviderReport {
            name: self.config.name,
            processed: self.processed,
        }
    }

    /// Handle one request; consumes it
    fn process(&mut self, request: Request) {
        self.set_state(ProviderState::Processing);
        info!(
            provider = %self.config.name,
            id = %request.id(),
            priority = %request.priority(),
            "Processing request"
        );
        self.sink.emit(ProcessedRecord::now(&self.config.name, &request));
        self.processed += 1;
    }

    fn set_state(&self, state: ProviderState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    // A dropped handle counts as a stop request
    fn shutdown_requested(&mut self) -> bool {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::domain::RequestId;
    use crate::provider::RateLimit;

    fn config(name: &str, rate: f64) -> ProviderConfig {
        ProviderConfig::new(name, RateLimit::new(rate).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rate_limiting_spacing() {
        let queue = Arc::new(PriorityQueue::new());
        for id in 1..=5u64 {
            queue.enqueue(Request::new(id, 1));
        }

        let (sink, mut rx) = EventSink::channel();
        let handle = Provider::start(config("P1", 20.0), Arc::clone(&queue), sink);

        let mut records = Vec::new();
        for _ in 0..5 {
            records.push(rx.recv().await.unwrap());
        }
        handle.shutdown().await.unwrap();

        // 20/s means 50ms between starts
        for pair in records.windows(2) {
            let gap = (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
            assert!(gap >= 45, "gap too small: {}ms", gap);
        }
    }

    #[tokio::test]
    async fn test_processes_in_priority_order() {
        let queue = Arc::new(PriorityQueue::new());
        queue.enqueue(Request::new(1, 1));
        queue.enqueue(Request::new(2, 3));
        queue.enqueue(Request::new(3, 2));

        let (sink, mut rx) = EventSink::channel();
        let handle = Provider::start(config("P1", 100.0), Arc::clone(&queue), sink);

        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(rx.recv().await.unwrap().request_id);
        }
        let report = handle.shutdown().await.unwrap();

        assert_eq!(order, vec![RequestId::new(2), RequestId::new(3), RequestId::new(1)]);
        assert_eq!(report.processed, 3);
        assert_eq!(report.name, "P1");
    }

    #[tokio::test]
    async fn test_idle_provider_processes_first_item_immediately() {
        let queue = Arc::new(PriorityQueue::new());
        let (sink, mut rx) = EventSink::channel();
        // Slow rate; only the first item must arrive promptly
        let handle = Provider::start_with_backoff(
            config("P1", 0.1),
            Arc::clone(&queue),
            sink,
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        let enqueued = Instant::now();
        queue.enqueue(Request::new(1, 1));

        let record = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.request_id, RequestId::new(1));
        assert!(enqueued.elapsed() < Duration::from_secs(1));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_interrupts_backoff() {
        let queue = Arc::new(PriorityQueue::new());
        let handle = Provider::start_with_backoff(
            config("P1", 1.0),
            queue,
            EventSink::discard(),
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        let report = tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("stop should interrupt the backoff sleep")
            .unwrap();
        assert_eq!(report.processed, 0);
    }

    #[tokio::test]
    async fn test_stop_interrupts_rate_limit_sleep() {
        let queue = Arc::new(PriorityQueue::new());
        queue.enqueue(Request::new(1, 1));
        queue.enqueue(Request::new(2, 1));

        let (sink, mut rx) = EventSink::channel();
        // 0.01/s means a 100s pause after the first request
        let handle = Provider::start(config("P1", 0.01), Arc::clone(&queue), sink);
        rx.recv().await.unwrap();

        let report = tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_tiny_rate_sleeps_instead_of_failing() {
        let queue = Arc::new(PriorityQueue::new());
        queue.enqueue(Request::new(1, 1));
        queue.enqueue(Request::new(2, 1));

        let (sink, mut rx) = EventSink::channel();
        let handle = Provider::start(config("P1", 1e-20), Arc::clone(&queue), sink);
        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let queue = Arc::new(PriorityQueue::new());
        let (sink, mut rx) = EventSink::channel();
        let handle = Provider::start_with_backoff(
            config("P1", 0.5),
            Arc::clone(&queue),
            sink,
            Duration::from_millis(10),
        );
        assert_eq!(handle.state(), ProviderState::Polling);

        let mut state_rx = handle.subscribe_state();
        queue.enqueue(Request::new(1, 1));
        rx.recv().await.unwrap();

        tokio::time::timeout(
            Duration::from_secs(1),
            state_rx.wait_for(|s| *s == ProviderState::Processing),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(handle.state(), ProviderState::Processing);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_handle_stops_provider() {
        let queue = Arc::new(PriorityQueue::new());
        let (sink, mut rx) = EventSink::channel();
        let handle = Provider::start_with_backoff(config("P1", 1.0), Arc::clone(&queue), sink, Duration::from_millis(10));

        drop(handle);

        // The task exits and drops its sink, closing the channel
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }
}
