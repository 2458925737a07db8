//! Integration tests for gatesight-common library.

use gatesight_common::{
    BrokerConfig, DEFAULT_EXCHANGE, Event, LogFormat, LoggingConfig, RoutingKeyBuilder,
    SensorKind, decode, encode,
};
use serde::Deserialize;

#[test]
fn test_full_event_workflow() {
    // Build the event the way a bridge does for RFID reader 2
    let kind = SensorKind::Rfid;
    let event = Event::new(1_700_000_000, kind.as_str(), kind.source("2"), "tag_id:0x00A1B2");
    let destination = RoutingKeyBuilder::new(kind).destination(DEFAULT_EXCHANGE, "2");

    assert_eq!(destination.exchange, "ex_sensors");
    assert_eq!(destination.routing_key, "event.rfid.2");

    // Encode as JSON
    let bytes = encode(&event).expect("JSON encode failed");
    assert!(!bytes.is_empty());

    // A consumer sees a well-formed document
    let value: serde_json::Value = serde_json::from_slice(&bytes).expect("invalid JSON");
    assert_eq!(value.as_object().map(|o| o.len()), Some(4));
    assert_eq!(value["timestamp"], 1_700_000_000);
    assert_eq!(value["source"], "rfid.2");

    // And the typed decode matches
    let decoded: Event = decode(&bytes).expect("JSON decode failed");
    assert_eq!(decoded, event);
}

#[test]
fn test_all_sensor_kinds() {
    let kinds = [(SensorKind::Rfid, "rfid"), (SensorKind::Pir, "pir")];

    for (kind, expected_str) in kinds {
        assert_eq!(kind.as_str(), expected_str);
        assert_eq!(format!("{}", kind), expected_str);

        let key = RoutingKeyBuilder::new(kind).build("1");
        assert_eq!(key, format!("event.{}.1", expected_str));
    }
}

#[test]
fn test_unusual_raw_readings_encode() {
    let readings = ["", "  ", "0xFFFFFF", "CHECKSUM FAILED", "tab\tinside", "ünïcödé"];

    for raw in readings {
        let event = Event::new(0, "rfid", "rfid.1", format!("tag_id:{}", raw));
        let bytes = encode(&event).unwrap();
        let decoded: Event = decode(&bytes).unwrap();
        assert_eq!(decoded.data, format!("tag_id:{}", raw));
    }
}

#[derive(Debug, Deserialize)]
struct GateConfig {
    #[serde(default)]
    broker: BrokerConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_config_sections_from_json5_with_comments() {
    let config: GateConfig = json5::from_str(
        r#"
        // gate A
        {
            broker: { host: "10.0.0.5", vhost: "gate", exchange: "ex_gate_a" },
            logging: { format: "json" },
        }
        "#,
    )
    .unwrap();

    assert_eq!(config.broker.host, "10.0.0.5");
    assert_eq!(config.broker.vhost, "gate");
    assert_eq!(config.broker.exchange, "ex_gate_a");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Json);
}
