//! Raw reader output to event conversion.

use chrono::{DateTime, Utc};

use gatesight_bridge_framework::{Event, SensorKind};

use crate::config::SensorIdentity;

/// Prefix of the `data` field for tag readings.
pub const TAG_DATA_PREFIX: &str = "tag_id:";

/// Turns raw reader lines into events for one sensor kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFormatter {
    kind: SensorKind,
}

impl EventFormatter {
    pub fn new(kind: SensorKind) -> Self {
        Self { kind }
    }

    /// Build the event for one raw reading.
    ///
    /// Never fails: `raw` ends up in `data` verbatim, however malformed.
    /// The capture time is truncated to whole seconds.
    pub fn format(
        &self,
        raw: &str,
        captured_at: DateTime<Utc>,
        identity: &SensorIdentity,
    ) -> Event {
        Event::new(
            captured_at.timestamp(),
            self.kind.as_str(),
            self.kind.source(identity.as_str()),
            format!("{}{}", TAG_DATA_PREFIX, raw),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gatesight_common::{decode, encode};

    fn at(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, millis * 1_000_000).unwrap()
    }

    #[test]
    fn test_format_rfid_reading() {
        let formatter = EventFormatter::new(SensorKind::Rfid);
        let event = formatter.format("AABBCC", at(1_600_000_000, 0), &"1".into());

        assert_eq!(event.timestamp, 1_600_000_000);
        assert_eq!(event.event_type, "rfid");
        assert_eq!(event.source, "rfid.1");
        assert_eq!(event.data, "tag_id:AABBCC");
    }

    #[test]
    fn test_timestamp_truncated_to_seconds() {
        let formatter = EventFormatter::default();
        let event = formatter.format("x", at(1_600_000_000, 999), &"1".into());
        assert_eq!(event.timestamp, 1_600_000_000);
    }

    #[test]
    fn test_raw_text_is_not_altered() {
        let formatter = EventFormatter::default();
        let event = formatter.format(" 0x00A1B2\t", at(0, 0), &"2".into());
        assert_eq!(event.data, "tag_id: 0x00A1B2\t");
    }

    #[test]
    fn test_any_reading_encodes_to_valid_json() {
        let formatter = EventFormatter::new(SensorKind::Pir);
        let readings = [
            "AABBCC",
            "RFID 1: CHECKSUM FAILED",
            "\"quoted\"",
            "back\\slash",
            "}{",
            "",
        ];

        for raw in readings {
            let event = formatter.format(raw, at(1_700_000_000, 0), &"3".into());
            let bytes = encode(&event).unwrap();

            let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert!(value["timestamp"].is_number());
            assert_eq!(value["source"], "pir.3");
            assert_eq!(value["data"], format!("tag_id:{}", raw));

            let decoded: gatesight_bridge_framework::Event = decode(&bytes).unwrap();
            assert_eq!(decoded, event);
        }
    }
}
