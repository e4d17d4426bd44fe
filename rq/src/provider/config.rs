//! Provider configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ProviderError;

/// Delay before retrying after the queue was found empty
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Rate substituted for an invalid configured rate (one request every 10 seconds)
pub const DEFAULT_RATE_LIMIT: f64 = 0.1;

/// Maximum requests per second; always finite and strictly positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RateLimit(f64);

impl RateLimit {
    /// Validate a requests-per-second value
    pub fn new(per_second: f64) -> Result<Self, ProviderError> {
        if per_second.is_finite() && per_second > 0.0 {
            Ok(Self(per_second))
        } else {
            Err(ProviderError::InvalidRateLimit(per_second))
        }
    }

    /// Validate `per_second`, substituting `default` when it is invalid
    pub fn or_default(per_second: f64, default: RateLimit) -> Self {
        Self::new(per_second).unwrap_or_else(|e| {
            warn!(error = %e, default = default.0, "RateLimit::or_default: substituting default rate");
            default
        })
    }

    pub fn per_second(self) -> f64 {
        self.0
    }

    /// Minimum spacing between two processing starts.
    ///
    /// Rates too small for a representable interval saturate at `Duration::MAX`.
    pub fn interval(self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.0).unwrap_or(Duration::MAX)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self(DEFAULT_RATE_LIMIT)
    }
}

impl std::fmt::Display for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/s", self.0)
    }
}

/// A validated provider: name plus rate limit
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub rate_limit: RateLimit,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, rate_limit: RateLimit) -> Self {
        Self {
            name: name.into(),
            rate_limit,
        }
    }
}

/// Unvalidated provider entry as written in config files or `NAME=RATE` on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,

    #[serde(rename = "rate-limit")]
    pub rate_limit: f64,
}

impl ProviderSpec {
    /// Build a provider config, replacing an invalid rate with `default`
    pub fn resolve(&self, default: RateLimit) -> ProviderConfig {
        ProviderConfig::new(self.name.clone(), RateLimit::or_default(self.rate_limit, default))
    }

    /// Build a provider config, rejecting an invalid rate
    pub fn validate(&self) -> Result<ProviderConfig, ProviderError> {
        Ok(ProviderConfig::new(self.name.clone(), RateLimit::new(self.rate_limit)?))
    }
}

impl std::str::FromStr for ProviderSpec {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rate) = s
            .split_once('=')
            .ok_or_else(|| ProviderError::InvalidSpec(s.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ProviderError::InvalidSpec(s.to_string()));
        }

        let rate_limit = rate
            .trim()
            .parse::<f64>()
            .map_err(|_| ProviderError::InvalidSpec(s.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            rate_limit,
        })
    }
}
