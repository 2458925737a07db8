use thiserror::Error;

/// Common error type for GateSight components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("Timed out after {timeout_ms}ms connecting to broker at {endpoint}")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using GateSight's Error.
pub type Result<T> = std::result::Result<T, Error>;
