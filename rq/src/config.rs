//! ratequeue configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::DispatchConfig;
use crate::domain::Priority;
use crate::provider::{DEFAULT_BACKOFF, DEFAULT_RATE_LIMIT, ProviderSpec, RateLimit};

/// Main ratequeue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Rate substituted when a provider's rate is not greater than 0
    #[serde(rename = "default-rate-limit")]
    pub default_rate_limit: f64,

    /// Empty-queue backoff in milliseconds
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,

    /// Number of requests to generate
    pub requests: u64,

    /// Lowest generated priority
    #[serde(rename = "priority-min")]
    pub priority_min: u8,

    /// Highest generated priority
    #[serde(rename = "priority-max")]
    pub priority_max: u8,

    /// Seed for generated priorities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Providers to start
    pub providers: Vec<ProviderSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            default_rate_limit: DEFAULT_RATE_LIMIT,
            backoff_ms: DEFAULT_BACKOFF.as_millis() as u64,
            requests: 10,
            priority_min: 1,
            priority_max: 3,
            seed: None,
            providers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized.
    ///
    /// Errors are swallowed; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::default_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    // Project-local .ratequeue.yml, then ~/.config/ratequeue/ratequeue.yml
    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".ratequeue.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ratequeue").join("ratequeue.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The fallback rate; itself falls back to the built-in default when invalid
    pub fn default_rate(&self) -> RateLimit {
        RateLimit::or_default(self.default_rate_limit, RateLimit::default())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Build a dispatcher configuration from `providers`, substituting the
    /// default rate for any invalid one
    pub fn dispatch_config(&self, providers: &[ProviderSpec]) -> DispatchConfig {
        let default_rate = self.default_rate();
        DispatchConfig {
            providers: providers.iter().map(|spec| spec.resolve(default_rate)).collect(),
            backoff: self.backoff(),
            priority_min: Priority::new(self.priority_min),
            priority_max: Priority::new(self.priority_max),
            seed: self.seed,
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.default_rate_limit, 0.1);
        assert_eq!(config.backoff(), Duration::from_secs(1));
        assert_eq!(config.requests, 10);
        assert_eq!((config.priority_min, config.priority_max), (1, 3));
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug
default-rate-limit: 0.5
backoff-ms: 250
requests: 40
priority-min: 1
priority-max: 5
seed: 99
providers:
  - name: P1
    rate-limit: 2
  - name: P2
    rate-limit: 0.2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.backoff(), Duration::from_millis(250));
        assert_eq!(config.requests, 40);
        assert_eq!(config.priority_max, 5);
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].rate_limit, 0.2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("requests: 3\n").unwrap();
        assert_eq!(config.requests, 3);
        assert_eq!(config.backoff_ms, 1000);
        assert_eq!(config.default_rate_limit, 0.1);
    }

    #[test]
    fn test_dispatch_config_substitutes_invalid_rate() {
        let config = Config {
            default_rate_limit: 0.5,
            ..Default::default()
        };
        let specs = vec![
            ProviderSpec {
                name: "P1".to_string(),
                rate_limit: 0.0,
            },
            ProviderSpec {
                name: "P2".to_string(),
                rate_limit: 4.0,
            },
        ];

        let dispatch = config.dispatch_config(&specs);
        assert_eq!(dispatch.providers[0].rate_limit.per_second(), 0.5);
        assert_eq!(dispatch.providers[1].rate_limit.per_second(), 4.0);
        assert_eq!(dispatch.priority_min, Priority::new(1));
    }

    #[test]
    fn test_invalid_default_rate_falls_back() {
        let config = Config {
            default_rate_limit: -1.0,
            ..Default::default()
        };
        assert_eq!(config.default_rate(), RateLimit::default());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ratequeue.yml");
        fs::write(&path, "log-level: warn\nrequests: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.requests, 7);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_kebab_keys() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("default-rate-limit"));
        assert!(yaml.contains("backoff-ms"));
    }
}
