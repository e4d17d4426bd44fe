//! ProviderHandle - caller-side control of a running provider

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::error::ProviderError;

/// Which branch the provider loop last took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderState {
    /// The last dequeue found the queue empty
    #[default]
    Polling,

    /// Handling a popped request or waiting out its rate-limit interval
    Processing,
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polling => write!(f, "polling"),
            Self::Processing => write!(f, "processing"),
        }
    }
}

/// Final tally returned when a provider loop exits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReport {
    pub name: String,
    pub processed: u64,
}

/// Handle for a provider loop running in its own task.
///
/// Dropping the handle also stops the provider.
pub struct ProviderHandle {
    name: String,
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<ProviderState>,
    task: JoinHandle<ProviderReport>,
}

impl ProviderHandle {
    pub(crate) fn new(
        name: String,
        shutdown_tx: mpsc::Sender<()>,
        state_rx: watch::Receiver<ProviderState>,
        task: JoinHandle<ProviderReport>,
    ) -> Self {
        debug!(%name, "ProviderHandle::new: called");
        Self {
            name,
            shutdown_tx,
            state_rx,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current loop state
    pub fn state(&self) -> ProviderState {
        *self.state_rx.borrow()
    }

    /// Receiver for observing state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ProviderState> {
        self.state_rx.clone()
    }

    /// Signal the loop to exit at its next iteration boundary.
    ///
    /// Interrupts a pending sleep but never a request being handled.
    pub fn stop(&self) {
        debug!(name = %self.name, "ProviderHandle::stop: called");
        // A full channel means a stop is already pending
        let _ = self.shutdown_tx.try_send(());
    }

    /// Wait for the loop to exit
    pub async fn join(self) -> Result<ProviderReport, ProviderError> {
        debug!(name = %self.name, "ProviderHandle::join: called");
        let Self {
            name,
            shutdown_tx,
            task,
            ..
        } = self;

        let result = task.await;
        drop(shutdown_tx);

        result.map_err(|e| ProviderError::TaskFailed {
            name,
            reason: e.to_string(),
        })
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(self) -> Result<ProviderReport, ProviderError> {
        self.stop();
        self.join().await
    }
}
