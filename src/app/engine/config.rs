//! Download engine configuration

use std::time::Duration;

use crate::constants::workers::FALLBACK_WORKER_COUNT;
use crate::errors::{ConfigError, ConfigResult};

/// Number of download workers to use when nothing overrides it
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKER_COUNT)
}

/// Configuration for one engine instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of simultaneous download tasks
    pub concurrency: usize,
    /// Courtesy delay awaited by each task after a successful write
    pub item_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            item_delay: Duration::ZERO,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the concurrency limit is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: "0".to_string(),
                reason: "at least one download worker is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.concurrency >= 1);
        assert_eq!(config.item_delay, Duration::ZERO);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = EngineConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
