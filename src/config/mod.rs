//! # Engine Configuration
//!
//! YAML-based configuration for the exchange engine. A file is optional:
//! [`EngineConfig::default`] is a complete, valid configuration, and every
//! section of the file falls back to its defaults when omitted.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sbb_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().exchange.call_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring sbb-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Command execution settings
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Lifecycle notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Failover across candidate endpoints
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// Timeout for synchronous sends issued by commands
    pub call_timeout_ms: u64,
    /// Default rethrow flag for new commands
    #[serde(default)]
    pub rethrow_failures: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResilienceConfig {
    /// Timeout applied uniformly to every candidate attempt
    pub call_timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: defaults::CALL_TIMEOUT.as_millis() as u64,
            rethrow_failures: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_size: defaults::NOTIFICATION_BUFFER_SIZE,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: defaults::RESILIENCE_CALL_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ExchangeConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl ResilienceConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.exchange.call_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "exchange.call_timeout_ms",
                "0",
                "call timeout must be greater than 0",
            ));
        }

        if self.resilience.call_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "resilience.call_timeout_ms",
                "0",
                "candidate call timeout must be greater than 0",
            ));
        }

        if self.notifications.enabled && self.notifications.buffer_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "notifications.buffer_size",
                "0",
                "buffer size must be greater than 0 when notifications are enabled",
            ));
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
        assert_eq!(config.exchange.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.resilience.call_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = EngineConfig::default();
        config.resilience.call_timeout_ms = 0;

        match config.validate() {
            Err(ConfigurationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "resilience.call_timeout_ms")
            }
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("exchange:\n  call_timeout_ms: 500\n").unwrap();
        assert_eq!(config.exchange.call_timeout_ms, 500);
        assert!(!config.exchange.rethrow_failures);
        assert!(config.notifications.enabled);
    }
}
