//! AMQP bridge for Wiegand RFID readers.
//!
//! Runs the reader program for one sensor and publishes every tag it reads.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use amqp_bridge_rfid::config::RfidBridgeConfig;
use amqp_bridge_rfid::controller::{Controller, Invocation, usage};
use gatesight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};

const BIN_NAME: &str = "amqp-bridge-rfid";

/// Exit status when the command line has too many sensor identities.
const EXIT_USAGE: u8 = 2;

/// AMQP bridge for Wiegand RFID readers.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(about = "Runs an RFID reader and publishes its tags to an AMQP exchange")]
#[command(version)]
struct Args {
    #[command(flatten)]
    common: BridgeArgs,

    /// Sensor identity; selects the reader pins and the routing key
    #[arg(value_name = "SENSOR_ID")]
    sensor: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Reject extra identities before touching config, logging or the reader.
    let identity = match Invocation::from_args(args.sensor) {
        Invocation::Run(identity) => identity,
        Invocation::Usage => {
            eprint!("{}", usage(BIN_NAME));
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let config = RfidBridgeConfig::load_or_default(args.common.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", args.common.config))?;

    // Leave the supervisor its own drain window before the runner gives up.
    let grace = config.rfid.shutdown_timeout() * 2;
    let runner = BridgeRunner::new_with_args("rfid", config, Some(&args.common))
        .context("Failed to start bridge")?
        .with_shutdown_timeout(grace);

    let controller = Controller::new(
        runner.config().rfid.clone(),
        runner.config().broker.exchange.clone(),
        runner.publisher(),
    );
    let shutdown = runner.shutdown_signal();

    let termination = runner
        .run_until(controller.run(identity, shutdown))
        .await?
        .context("Reader failed")?;

    info!(
        reason = ?termination.reason,
        lines_read = termination.lines_read,
        published = termination.publish.success,
        failed = termination.publish.failed,
        "RFID bridge stopped"
    );

    Ok(ExitCode::SUCCESS)
}
