//! Configuration traits and utilities.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{BridgeError, Result};
use crate::{BrokerConfig, LoggingConfig};

/// Trait for bridge configuration types.
///
/// Implement this trait for your bridge's configuration struct to get
/// automatic loading, validation, and access to common config fields.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use gatesight_bridge_framework::{BridgeConfig, BrokerConfig, LoggingConfig};
///
/// #[derive(Debug, Default, Deserialize)]
/// pub struct MyBridgeConfig {
///     pub broker: BrokerConfig,
///     pub logging: LoggingConfig,
///     pub my_sensor: MySensorConfig,
/// }
///
/// impl BridgeConfig for MyBridgeConfig {
///     fn broker(&self) -> &BrokerConfig {
///         &self.broker
///     }
///
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
/// }
/// ```
pub trait BridgeConfig: Sized + DeserializeOwned + Default {
    /// Get the broker configuration.
    fn broker(&self) -> &BrokerConfig;

    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Validate the configuration.
    ///
    /// Called automatically after loading. The default checks the broker
    /// section; overrides should keep calling [`validate_broker`].
    fn validate(&self) -> Result<()> {
        validate_broker(self.broker())
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise validate and return the defaults.
    fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}

/// Check the broker section of a bridge configuration.
pub fn validate_broker(broker: &BrokerConfig) -> Result<()> {
    if broker.host.trim().is_empty() {
        return Err(BridgeError::validation("broker.host must not be empty"));
    }
    if broker.exchange.trim().is_empty() {
        return Err(BridgeError::validation("broker.exchange must not be empty"));
    }
    if broker.connect_timeout_ms == 0 {
        return Err(BridgeError::validation(
            "broker.connect_timeout_ms must be greater than zero",
        ));
    }
    Ok(())
}
