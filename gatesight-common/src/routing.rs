use std::fmt;

use crate::event::SensorKind;

/// Default exchange all GateSight sensor events are published to.
pub const DEFAULT_EXCHANGE: &str = "ex_sensors";

/// Leading segment of every sensor event routing key.
pub const ROUTING_KEY_ROOT: &str = "event";

/// A broker target: exchange plus routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub exchange: String,
    pub routing_key: String,
}

impl Destination {
    /// Create a destination from its parts.
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.exchange, self.routing_key)
    }
}

/// Builder for sensor event routing keys.
///
/// Routing keys are the prefix followed directly by the sensor identity.
/// The default prefix is `event.<kind>.`, so keys look like `event.rfid.1`.
#[derive(Debug, Clone)]
pub struct RoutingKeyBuilder {
    prefix: String,
}

impl RoutingKeyBuilder {
    /// Create a builder using the default prefix for a sensor kind.
    pub fn new(kind: SensorKind) -> Self {
        Self {
            prefix: default_prefix(kind),
        }
    }

    /// Create a builder with a custom prefix.
    ///
    /// The prefix is used verbatim; include a trailing `.` if one is wanted.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The prefix this builder prepends.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the routing key for a sensor identity.
    ///
    /// # Example
    /// ```
    /// use gatesight_common::event::SensorKind;
    /// use gatesight_common::routing::RoutingKeyBuilder;
    ///
    /// let builder = RoutingKeyBuilder::new(SensorKind::Rfid);
    /// assert_eq!(builder.build("1"), "event.rfid.1");
    /// ```
    pub fn build(&self, identity: &str) -> String {
        format!("{}{}", self.prefix, identity)
    }

    /// Build the full destination for a sensor identity on an exchange.
    pub fn destination(&self, exchange: &str, identity: &str) -> Destination {
        Destination::new(exchange, self.build(identity))
    }
}

/// Default routing key prefix for a sensor kind: `event.<kind>.`
///
/// # Example
/// ```
/// use gatesight_common::event::SensorKind;
/// use gatesight_common::routing::default_prefix;
///
/// assert_eq!(default_prefix(SensorKind::Pir), "event.pir.");
/// ```
pub fn default_prefix(kind: SensorKind) -> String {
    format!("{}.{}.", ROUTING_KEY_ROOT, kind.as_str())
}
