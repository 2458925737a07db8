//! GateSight Bridge Framework
//!
//! Common abstractions for building sensor bridges that publish events to an
//! AMQP broker.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (startup, shutdown, signal handling)
//! - [`Publisher`] for publishing events with one broker connection per message
//! - [`EventSink`] as the seam between bridges and the publisher
//! - [`BridgeArgs`] for common CLI argument parsing
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use gatesight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
//!
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     common: BridgeArgs,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse();
//!     let config = MyBridgeConfig::load_or_default(cli.common.config.as_deref())?;
//!
//!     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&cli.common))?;
//!     let worker = my_worker(runner.publisher(), runner.shutdown_signal());
//!
//!     // Run until the worker ends or Ctrl+C
//!     runner.run_until(worker).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod error;
mod publisher;
mod runner;

pub use args::BridgeArgs;
pub use config::{BridgeConfig, validate_broker};
pub use error::{BridgeError, Result};
pub use publisher::{EventSink, PublishCounters, PublishStats, Publisher};
pub use runner::{BridgeRunner, wait_for_signal};

// Re-export commonly used types from gatesight-common
pub use gatesight_common::{
    BrokerConfig, Destination, Event, LogFormat, LoggingConfig, RoutingKeyBuilder, SensorKind,
};
