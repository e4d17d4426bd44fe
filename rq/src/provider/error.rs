//! Provider error types

use thiserror::Error;

/// Errors from configuring or joining a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Rate limit must be a finite number greater than 0, got {0}")]
    InvalidRateLimit(f64),

    #[error("Invalid provider '{0}', expected NAME=RATE")]
    InvalidSpec(String),

    #[error("Provider {name} task failed: {reason}")]
    TaskFailed { name: String, reason: String },
}
