//! GateSight Common Library
//!
//! This crate provides shared types and utilities for GateSight sensor bridges:
//!
//! - [`event`] - Sensor event data model (`Event`, `SensorKind`)
//! - [`routing`] - Broker destinations and routing key builders
//! - [`serialization`] - JSON wire encoding and decoding
//! - [`config`] - Broker and logging configuration sections
//! - [`broker`] - AMQP connection setup
//! - [`error`] - Error types

pub mod broker;
pub mod config;
pub mod error;
pub mod event;
pub mod routing;
pub mod serialization;

// Re-export commonly used types at the crate root
pub use broker::connect;
pub use config::{BrokerConfig, LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use event::{Event, SensorKind};
pub use routing::{DEFAULT_EXCHANGE, Destination, RoutingKeyBuilder, default_prefix};
pub use serialization::{CONTENT_TYPE, decode, encode};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
///
/// # Example
///
/// ```ignore
/// use gatesight_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let layer = match config.format {
        LogFormat::Text => fmt::layer().with_target(false).boxed(),
        LogFormat::Json => fmt::layer().json().flatten_event(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize tracing: {e}")))
}
