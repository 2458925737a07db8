//! Configuration for the RFID bridge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use gatesight_bridge_framework::{
    BridgeConfig, BridgeError, BrokerConfig, LoggingConfig, Result, RoutingKeyBuilder, SensorKind,
    validate_broker,
};

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfidBridgeConfig {
    /// Broker connection settings
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reader-specific settings
    #[serde(default)]
    pub rfid: RfidConfig,
}

impl BridgeConfig for RfidBridgeConfig {
    fn broker(&self) -> &BrokerConfig {
        &self.broker
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<()> {
        validate_broker(&self.broker)?;
        self.rfid.validate()
    }
}

/// Identifier of one physical sensor instance (e.g. "1", "2").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorIdentity(String);

impl SensorIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SensorIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Wiegand data line pins (wiringPi numbering) of one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinPair {
    /// DATA0 pin
    pub d0: u8,
    /// DATA1 pin
    pub d1: u8,
}

impl PinPair {
    pub const fn new(d0: u8, d1: u8) -> Self {
        Self { d0, d1 }
    }

    /// Command-line arguments passed to the reader binary.
    pub fn to_args(self) -> [String; 2] {
        [self.d0.to_string(), self.d1.to_string()]
    }
}

impl fmt::Display for PinPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D0={} D1={}", self.d0, self.d1)
    }
}

/// External reader program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Path to the reader binary
    #[serde(default = "default_reader_binary")]
    pub binary: PathBuf,

    /// Arguments placed before the pin pair
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_reader_binary() -> PathBuf {
    PathBuf::from("./rfid")
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            binary: default_reader_binary(),
            args: Vec::new(),
        }
    }
}

/// Reader and dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfidConfig {
    /// Sensor kind, used as event_type and source domain
    #[serde(default)]
    pub sensor_kind: SensorKind,

    /// Routing key prefix; the sensor identity is appended verbatim.
    /// Defaults to `event.<sensor_kind>.`
    #[serde(default)]
    pub routing_key_prefix: Option<String>,

    /// Identity used when none is given on the command line
    #[serde(default = "default_identity")]
    pub default_identity: SensorIdentity,

    /// Reader program
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Pin pair per sensor identity
    #[serde(default = "default_pin_table")]
    pub pins: BTreeMap<String, PinPair>,

    /// Pins used for identities missing from `pins`
    #[serde(default = "default_fallback_pins")]
    pub default_pins: PinPair,

    /// Number of concurrent publisher workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Lines buffered between the reader and the workers
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Time allowed for queued events to drain on termination, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_identity() -> SensorIdentity {
    SensorIdentity::new("1")
}

/// Module 1 doubles as the fallback, so its pins equal `default_fallback_pins`.
fn default_pin_table() -> BTreeMap<String, PinPair> {
    BTreeMap::from([
        ("1".to_string(), default_fallback_pins()),
        ("2".to_string(), PinPair::new(7, 0)),
    ])
}

fn default_fallback_pins() -> PinPair {
    PinPair::new(3, 2)
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

impl Default for RfidConfig {
    fn default() -> Self {
        Self {
            sensor_kind: SensorKind::default(),
            routing_key_prefix: None,
            default_identity: default_identity(),
            reader: ReaderConfig::default(),
            pins: default_pin_table(),
            default_pins: default_fallback_pins(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl RfidConfig {
    /// Validate reader and dispatch settings.
    pub fn validate(&self) -> Result<()> {
        if self.reader.binary.as_os_str().is_empty() {
            return Err(BridgeError::validation("rfid.reader.binary must not be empty"));
        }
        if self.default_identity.as_str().is_empty() {
            return Err(BridgeError::validation(
                "rfid.default_identity must not be empty",
            ));
        }
        if self.workers == 0 {
            return Err(BridgeError::validation("rfid.workers must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(BridgeError::validation(
                "rfid.queue_capacity must be at least 1",
            ));
        }
        if let Some(prefix) = &self.routing_key_prefix {
            if prefix.is_empty() {
                return Err(BridgeError::validation(
                    "rfid.routing_key_prefix must not be empty when set",
                ));
            }
        }
        Ok(())
    }

    /// Resolve the pin pair for an identity.
    ///
    /// Unknown identities are not an error: they get `default_pins`, and the
    /// fallback is logged.
    pub fn resolve_pins(&self, identity: &SensorIdentity) -> PinPair {
        match self.pins.get(identity.as_str()) {
            Some(pins) => *pins,
            None => {
                warn!(
                    identity = %identity,
                    pins = %self.default_pins,
                    "Unknown sensor identity, using default pins"
                );
                self.default_pins
            }
        }
    }

    /// Routing key builder for this sensor kind and prefix.
    pub fn routing_keys(&self) -> RoutingKeyBuilder {
        match &self.routing_key_prefix {
            Some(prefix) => RoutingKeyBuilder::with_prefix(prefix.clone()),
            None => RoutingKeyBuilder::new(self.sensor_kind),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            broker: { host: "gate.local", username: "admin", password: "admin" },
            logging: { level: "debug" },
            rfid: {
                sensor_kind: "rfid",
                routing_key_prefix: "event.rfid.",
                default_identity: "2",
                reader: { binary: "/opt/gate/rfid", args: ["-d"] },
                pins: { "1": { d0: 7, d1: 0 }, "4": { d0: 10, d1: 11 } },
                default_pins: { d0: 3, d1: 2 },
                workers: 2,
                queue_capacity: 16,
                shutdown_timeout_secs: 1,
            }
        }"#;

        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.broker.host, "gate.local");
        assert_eq!(config.rfid.default_identity, SensorIdentity::new("2"));
        assert_eq!(config.rfid.reader.binary, PathBuf::from("/opt/gate/rfid"));
        assert_eq!(config.rfid.reader.args, vec!["-d".to_string()]);
        assert_eq!(config.rfid.pins.len(), 2);
        assert_eq!(config.rfid.pins["4"], PinPair::new(10, 11));
        assert_eq!(config.rfid.workers, 2);
        assert_eq!(config.rfid.shutdown_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_defaults() {
        let config: RfidBridgeConfig = json5::from_str("{}").unwrap();
        config.validate().unwrap();

        let rfid = &config.rfid;
        assert_eq!(rfid.sensor_kind, SensorKind::Rfid);
        assert_eq!(rfid.default_identity.as_str(), "1");
        assert_eq!(rfid.reader.binary, PathBuf::from("./rfid"));
        assert_eq!(rfid.pins["1"], PinPair::new(3, 2));
        assert_eq!(rfid.pins["2"], PinPair::new(7, 0));
        assert_eq!(rfid.default_pins, PinPair::new(3, 2));
        assert_eq!(rfid.workers, 4);
        assert_eq!(rfid.queue_capacity, 256);
        assert_eq!(rfid.routing_keys().build("1"), "event.rfid.1");
    }

    #[test]
    fn test_resolve_known_identity() {
        let rfid = RfidConfig::default();
        assert_eq!(rfid.resolve_pins(&"2".into()), PinPair::new(7, 0));
    }

    #[test]
    fn test_default_identity_and_unknown_identity_share_pins() {
        let rfid = RfidConfig::default();
        let default = rfid.resolve_pins(&rfid.default_identity);

        assert_eq!(default, rfid.default_pins);
        assert_eq!(rfid.resolve_pins(&"9".into()), default);
    }

    #[test]
    fn test_resolve_unknown_identity_falls_back() {
        let rfid = RfidConfig::default();

        for unknown in ["9", "", "front-door", "01"] {
            assert_eq!(rfid.resolve_pins(&unknown.into()), PinPair::new(3, 2));
        }
    }

    #[test]
    fn test_routing_prefix_follows_sensor_kind() {
        let json = r#"{ rfid: { sensor_kind: "pir" } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert_eq!(config.rfid.routing_keys().build("3"), "event.pir.3");

        let json = r#"{ rfid: { sensor_kind: "pir", routing_key_prefix: "gate.b." } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert_eq!(config.rfid.routing_keys().build("3"), "gate.b.3");
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let json = r#"{ rfid: { workers: 0 } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(BridgeError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_queue() {
        let json = r#"{ rfid: { queue_capacity: 0 } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_binary_and_exchange() {
        let json = r#"{ rfid: { reader: { binary: "" } } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{ broker: { exchange: "" } }"#;
        let config: RfidBridgeConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pin_args() {
        assert_eq!(PinPair::new(7, 0).to_args(), ["7".to_string(), "0".to_string()]);
    }
}
