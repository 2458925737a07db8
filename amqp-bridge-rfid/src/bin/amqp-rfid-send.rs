//! Publish a single tag read out of band.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use amqp_bridge_rfid::config::{RfidBridgeConfig, SensorIdentity};
use amqp_bridge_rfid::formatter::EventFormatter;
use gatesight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};

/// Publish one RFID tag to the AMQP exchange.
#[derive(Parser, Debug)]
#[command(name = "amqp-rfid-send")]
#[command(about = "Publishes a single RFID tag to an AMQP exchange")]
#[command(version)]
struct Args {
    #[command(flatten)]
    common: BridgeArgs,

    /// Tag as printed by the reader
    tag: String,

    /// Sensor identity (defaults to the configured one)
    sensor: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = RfidBridgeConfig::load_or_default(args.common.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", args.common.config))?;

    let identity = args
        .sensor
        .map(SensorIdentity::from)
        .unwrap_or_else(|| config.rfid.default_identity.clone());

    let runner = BridgeRunner::new_with_args("rfid-send", config, Some(&args.common))
        .context("Failed to start sender")?;

    let rfid = &runner.config().rfid;
    let event =
        EventFormatter::new(rfid.sensor_kind).format(args.tag.trim(), Utc::now(), &identity);
    let destination = rfid
        .routing_keys()
        .destination(&runner.config().broker.exchange, identity.as_str());
    let publisher = runner.publisher();

    runner
        .run_until(async move { publisher.publish(&destination, &event).await })
        .await?
        .with_context(|| format!("Problem reaching the broker, discarding tag {}", args.tag))?;

    Ok(())
}
