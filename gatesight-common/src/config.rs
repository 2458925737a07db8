use serde::{Deserialize, Serialize};
use std::time::Duration;

use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};

/// Common AMQP broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Virtual host.
    #[serde(default = "default_vhost")]
    pub vhost: String,

    /// Username for PLAIN authentication.
    #[serde(default = "default_username")]
    pub username: String,

    /// Password for PLAIN authentication.
    #[serde(default = "default_password")]
    pub password: String,

    /// Exchange events are published to. Must already exist on the broker.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Publish with delivery mode 2 (persistent).
    #[serde(default = "default_persistent")]
    pub persistent: bool,

    /// Upper bound on connection setup, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_username() -> String {
    "guest".to_string()
}

fn default_password() -> String {
    "guest".to_string()
}

fn default_exchange() -> String {
    crate::routing::DEFAULT_EXCHANGE.to_string()
}

fn default_persistent() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            vhost: default_vhost(),
            username: default_username(),
            password: default_password(),
            exchange: default_exchange(),
            persistent: default_persistent(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl BrokerConfig {
    /// Build the AMQP URI for this broker.
    ///
    /// Built field by field so credentials and vhost never need percent-encoding.
    pub fn amqp_uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            ..Default::default()
        }
    }

    /// `host:port` of the broker, for log output (never includes credentials).
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection setup timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
