//! Bridge runner for lifecycle management.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use gatesight_common::{LoggingConfig, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::publisher::Publisher;

/// How long the bridge's main future gets to wind down after a signal.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bridge runner that manages the lifecycle of a sensor bridge.
///
/// Handles:
/// - Logging initialization
/// - Publisher construction
/// - Graceful shutdown on Ctrl+C or SIGTERM
///
/// # Example
///
/// ```ignore
/// use gatesight_bridge_framework::{BridgeConfig, BridgeRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = MyBridgeConfig::load_or_default(None)?;
///     let runner = BridgeRunner::new_with_args("mybridge", config, None)?;
///
///     let publisher = runner.publisher();
///     let shutdown = runner.shutdown_signal();
///     runner.run_until(my_worker(publisher, shutdown)).await?;
///     Ok(())
/// }
/// ```
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging.
    name: String,
    /// The loaded configuration.
    config: C,
    /// Publisher for events.
    publisher: Publisher,
    /// Set to `true` once a shutdown signal arrives.
    shutdown_tx: watch::Sender<bool>,
    /// Grace period for the main future after shutdown is signalled.
    shutdown_timeout: Duration,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner.
    ///
    /// This will:
    /// 1. Initialize logging based on config, with the CLI `--log-level` override
    /// 2. Create the publisher
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION");

        let log_config = effective_logging(config.logging(), args);
        init_tracing(&log_config).map_err(|e| BridgeError::config(e.to_string()))?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");
        tracing::info!(
            endpoint = %config.broker().endpoint(),
            exchange = %config.broker().exchange,
            "Publishing to broker"
        );

        let publisher = Publisher::new(config.broker().clone());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            name,
            config,
            publisher,
            shutdown_tx,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Set how long the main future may take to finish after a shutdown signal.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a clone of the publisher.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Receiver that flips to `true` when the bridge is asked to stop.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Run `main` until it completes or a shutdown signal arrives.
    ///
    /// On Ctrl+C or SIGTERM the shutdown channel is set and `main` is given
    /// the shutdown timeout to finish on its own. It is dropped if it does not.
    pub async fn run_until<F, T>(self, main: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tracing::info!(bridge = %self.name, "Bridge running. Press Ctrl+C to stop.");

        tokio::pin!(main);

        let output = tokio::select! {
            output = &mut main => output,
            _ = wait_for_signal() => {
                tracing::info!(bridge = %self.name, "Received shutdown signal");
                // Receivers may already be gone if `main` dropped them.
                let _ = self.shutdown_tx.send(true);

                tokio::time::timeout(self.shutdown_timeout, &mut main)
                    .await
                    .map_err(|_| {
                        BridgeError::worker(format!(
                            "{} did not stop within {:?}",
                            self.name, self.shutdown_timeout
                        ))
                    })?
            }
        };

        tracing::info!(bridge = %self.name, "Goodbye!");

        Ok(output)
    }
}

/// Logging config with the CLI `--log-level` override applied.
fn effective_logging(config: &LoggingConfig, args: Option<&BridgeArgs>) -> LoggingConfig {
    match args.and_then(|a| a.log_level.as_ref()) {
        Some(level) => LoggingConfig {
            level: level.clone(),
            format: config.format,
        },
        None => config.clone(),
    }
}

/// Resolve when the process receives Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
