// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link discovery configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Discovery settings shared by every agent of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Run discovery at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between probe rounds (milliseconds).
    #[serde(default = "default_probe_rate")]
    pub probe_rate_ms: u64,

    /// Also send BDDP probes to find links through non-OpenFlow segments.
    #[serde(default = "default_true")]
    pub use_bddp: bool,

    /// A link not re-confirmed within this age is vanished (milliseconds).
    #[serde(default = "default_stale_link_age")]
    pub stale_link_age_ms: u64,

    /// Timer worker threads executing probe rounds.
    #[serde(default = "default_timer_workers")]
    pub timer_workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_probe_rate() -> u64 {
    3000
}

fn default_stale_link_age() -> u64 {
    10_000
}

fn default_timer_workers() -> usize {
    4
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_rate_ms: default_probe_rate(),
            use_bddp: true,
            stale_link_age_ms: default_stale_link_age(),
            timer_workers: default_timer_workers(),
        }
    }
}

impl DiscoveryConfig {
    /// Load and validate a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn probe_rate(&self) -> Duration {
        Duration::from_millis(self.probe_rate_ms)
    }

    pub fn stale_link_age(&self) -> Duration {
        Duration::from_millis(self.stale_link_age_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_rate_ms == 0 {
            return Err(ConfigError::Invalid("probe_rate_ms must be > 0".into()));
        }
        if self.stale_link_age_ms < self.probe_rate_ms {
            return Err(ConfigError::Invalid(format!(
                "stale_link_age_ms ({}) must be >= probe_rate_ms ({})",
                self.stale_link_age_ms, self.probe_rate_ms
            )));
        }
        if self.timer_workers == 0 {
            return Err(ConfigError::Invalid("timer_workers must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert!(config.enabled);
        assert!(config.use_bddp);
        assert_eq!(config.probe_rate(), Duration::from_secs(3));
        assert_eq!(config.stale_link_age(), Duration::from_secs(10));
        assert_eq!(config.timer_workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: DiscoveryConfig = serde_json::from_str(r#"{"use_bddp": false}"#).unwrap();
        assert!(!config.use_bddp);
        assert_eq!(config.probe_rate_ms, 3000);
        assert!(config.enabled);
    }

    #[test]
    fn test_validation_zero_rate() {
        let config = DiscoveryConfig {
            probe_rate_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_stale_age_below_rate() {
        let config = DiscoveryConfig {
            probe_rate_ms: 5000,
            stale_link_age_ms: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_workers() {
        let config = DiscoveryConfig {
            timer_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discovery.json");
        let config = DiscoveryConfig {
            probe_rate_ms: 500,
            stale_link_age_ms: 2000,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        assert_eq!(DiscoveryConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"probe_rate_ms": 0}}"#).unwrap();
        assert!(matches!(
            DiscoveryConfig::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            DiscoveryConfig::from_file(garbage.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
