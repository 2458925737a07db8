//! AMQP bridge for Wiegand RFID readers.
//!
//! This bridge runs an external reader program for one sensor, turns every
//! line it prints into an event, and publishes the event to an AMQP topic
//! exchange.
//!
//! # Routing Keys
//!
//! ```text
//! event.<sensor_kind>.<identity>
//! ```
//!
//! Where:
//! - `<sensor_kind>` - `rfid` or `pir`
//! - `<identity>` - Sensor identity from the command line (default `1`)
//!
//! # Event Payload
//!
//! ```json
//! {"timestamp": 1700000000, "event_type": "rfid", "source": "rfid.1", "data": "tag_id:AABBCC"}
//! ```

pub mod config;
pub mod controller;
pub mod formatter;
pub mod supervisor;
