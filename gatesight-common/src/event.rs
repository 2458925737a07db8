use serde::{Deserialize, Serialize};

/// A single sensor event published by bridges.
///
/// One event is produced per sensor reading. It is never persisted or
/// deduplicated: once handed to the broker it is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unix epoch seconds when the reading was captured.
    pub timestamp: i64,

    /// Kind of sensor that produced the reading (e.g., "rfid", "pir").
    pub event_type: String,

    /// Sensor instance, `<kind>.<identity>` (e.g., "rfid.1").
    pub source: String,

    /// Reading payload (e.g., "tag_id:0A1B2C").
    pub data: String,
}

impl Event {
    /// Create a new event.
    pub fn new(
        timestamp: i64,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            source: source.into(),
            data: data.into(),
        }
    }
}

/// Sensor kind, used both as `event_type` and as the source domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Wiegand or RS232 RFID tag readers.
    #[default]
    Rfid,
    /// Passive infrared presence sensors.
    Pir,
}

impl SensorKind {
    /// Get the string representation used in events and routing keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Rfid => "rfid",
            SensorKind::Pir => "pir",
        }
    }

    /// Source name for a sensor instance of this kind.
    pub fn source(&self, identity: &str) -> String {
        format!("{}.{}", self.as_str(), identity)
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(1_600_000_000, "rfid", "rfid.1", "tag_id:AABBCC");

        assert_eq!(event.timestamp, 1_600_000_000);
        assert_eq!(event.event_type, "rfid");
        assert_eq!(event.source, "rfid.1");
        assert_eq!(event.data, "tag_id:AABBCC");
    }

    #[test]
    fn test_sensor_kind_display() {
        assert_eq!(SensorKind::Rfid.as_str(), "rfid");
        assert_eq!(SensorKind::Pir.to_string(), "pir");
        assert_eq!(SensorKind::Rfid.source("2"), "rfid.2");
    }

    #[test]
    fn test_sensor_kind_deserialize() {
        let kind: SensorKind = serde_json::from_str("\"pir\"").unwrap();
        assert_eq!(kind, SensorKind::Pir);
        assert_eq!(SensorKind::default(), SensorKind::Rfid);
    }
}
