//! Dispatcher - drives a simulation end to end
//!
//! The dispatcher owns the shared queue and the receiving end of the record
//! channel. It starts one provider per configured entry, submits requests,
//! waits until every submitted request has produced its record, then stops
//! the providers.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::{Priority, Request, RequestId};
use crate::events::{EventSink, ProcessedRecord};
use crate::provider::{DEFAULT_BACKOFF, Provider, ProviderConfig, ProviderError, ProviderHandle, ProviderReport};
use crate::queue::PriorityQueue;

/// Errors from building or driving a dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("At least one provider is required")]
    NoProviders,

    #[error("Invalid priority range {min}..={max}")]
    InvalidPriorityRange { min: Priority, max: Priority },

    #[error("Providers are not running; {pending} requests can never drain")]
    NotStarted { pending: u64 },

    #[error("Every provider stopped with {pending} requests still pending")]
    ProvidersStopped { pending: u64 },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Providers to start, in order
    pub providers: Vec<ProviderConfig>,

    /// Empty-queue backoff for every provider
    pub backoff: Duration,

    /// Lowest generated priority
    pub priority_min: Priority,

    /// Highest generated priority
    pub priority_max: Priority,

    /// Seed for generated priorities; random when unset
    pub seed: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            backoff: DEFAULT_BACKOFF,
            priority_min: Priority::new(1),
            priority_max: Priority::new(3),
            seed: None,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub submitted: u64,
    pub records: Vec<ProcessedRecord>,
    pub reports: Vec<ProviderReport>,
}

pub struct Dispatcher {
    config: DispatchConfig,
    queue: Arc<PriorityQueue>,
    /// Handed out to providers by `start`, then dropped
    sink: Option<EventSink>,
    records_rx: mpsc::UnboundedReceiver<ProcessedRecord>,
    handles: Vec<ProviderHandle>,
    rng: StdRng,
    next_id: u64,
    submitted: u64,
    received: u64,
}

impl Dispatcher {
    /// Create a dispatcher; providers are not started yet
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        debug!(?config, "Dispatcher::new: called");
        if config.providers.is_empty() {
            return Err(DispatchError::NoProviders);
        }
        if config.priority_min > config.priority_max {
            return Err(DispatchError::InvalidPriorityRange {
                min: config.priority_min,
                max: config.priority_max,
            });
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (sink, records_rx) = EventSink::channel();

        Ok(Self {
            config,
            queue: Arc::new(PriorityQueue::new()),
            sink: Some(sink),
            records_rx,
            handles: Vec::new(),
            rng,
            next_id: 1,
            submitted: 0,
            received: 0,
        })
    }

    /// The shared queue
    pub fn queue(&self) -> Arc<PriorityQueue> {
        Arc::clone(&self.queue)
    }

    /// Spawn every configured provider. Calling it again is a no-op.
    ///
    /// Only the providers hold senders afterwards, so the record channel
    /// closes once all of them have exited.
    pub fn start(&mut self) {
        let Some(sink) = self.sink.take() else {
            debug!("Dispatcher::start: already started");
            return;
        };

        for config in &self.config.providers {
            info!(provider = %config.name, rate_limit = %config.rate_limit, "Starting provider");
            let handle = Provider::start_with_backoff(config.clone(), self.queue(), sink.clone(), self.config.backoff);
            self.handles.push(handle);
        }
    }

    /// Enqueue one request with the next id
    pub fn submit(&mut self, priority: Priority) -> RequestId {
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        self.queue.enqueue(Request::new(id, priority));
        self.submitted += 1;
        id
    }

    /// Enqueue `count` requests with random priorities in the configured range
    pub fn generate(&mut self, count: u64) -> Vec<RequestId> {
        debug!(count, "Dispatcher::generate: called");
        let (min, max) = (self.config.priority_min.level(), self.config.priority_max.level());
        (0..count)
            .map(|_| {
                let priority = Priority::new(self.rng.random_range(min..=max));
                self.submit(priority)
            })
            .collect()
    }

    /// Submitted requests whose record has not arrived yet
    pub fn outstanding(&self) -> u64 {
        self.submitted - self.received
    }

    /// Wait until every submitted request has been processed.
    ///
    /// `on_record` sees each record as it arrives; the records are also
    /// returned in arrival order.
    pub async fn wait_drained<F>(&mut self, mut on_record: F) -> Result<Vec<ProcessedRecord>, DispatchError>
    where
        F: FnMut(&ProcessedRecord),
    {
        debug!(outstanding = self.outstanding(), "Dispatcher::wait_drained: called");
        if self.handles.is_empty() && self.outstanding() > 0 {
            return Err(DispatchError::NotStarted {
                pending: self.outstanding(),
            });
        }

        let mut records = Vec::new();
        while self.outstanding() > 0 {
            let Some(record) = self.records_rx.recv().await else {
                warn!(outstanding = self.outstanding(), "Dispatcher: every provider exited before the drain");
                return Err(DispatchError::ProvidersStopped {
                    pending: self.outstanding(),
                });
            };
            on_record(&record);
            self.received += 1;
            records.push(record);
        }

        info!(processed = records.len(), "Dispatcher: queue drained");
        Ok(records)
    }

    /// Stop every provider and collect their reports
    pub async fn shutdown(&mut self) -> Result<Vec<ProviderReport>, DispatchError> {
        debug!(providers = self.handles.len(), "Dispatcher::shutdown: called");
        for handle in &self.handles {
            handle.stop();
        }

        let mut reports = Vec::with_capacity(self.handles.len());
        for handle in self.handles.drain(..) {
            reports.push(handle.join().await?);
        }
        Ok(reports)
    }

    /// Start providers, generate `count` requests, wait for the drain and stop
    pub async fn run<F>(mut self, count: u64, on_record: F) -> Result<DispatchSummary, DispatchError>
    where
        F: FnMut(&ProcessedRecord),
    {
        self.start();
        self.generate(count);
        let records = self.wait_drained(on_record).await?;
        let reports = self.shutdown().await?;

        Ok(DispatchSummary {
            submitted: self.submitted,
            records,
            reports,
        })
    }
}
