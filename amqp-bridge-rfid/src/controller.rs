//! Command-line entry logic: pick the sensor, run it, stop it on shutdown.

use tokio::sync::watch;
use tracing::info;

use gatesight_bridge_framework::EventSink;

use crate::config::{RfidConfig, SensorIdentity};
use crate::supervisor::{Supervisor, SupervisorError, Termination, stop_requested};

/// What the positional arguments ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run one sensor; `None` means the configured default identity.
    Run(Option<SensorIdentity>),
    /// Too many arguments: print usage and do nothing else.
    Usage,
}

impl Invocation {
    /// Classify the positional arguments (program name excluded).
    pub fn from_args<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (None, _) => Invocation::Run(None),
            (Some(id), None) => Invocation::Run(Some(SensorIdentity::new(id))),
            (Some(_), Some(_)) => Invocation::Usage,
        }
    }
}

/// Two-line usage message.
pub fn usage(program: &str) -> String {
    format!(
        "usage: {program} [SENSOR_ID]\n       \
         SENSOR_ID selects the reader pins and routing key \
         (default: rfid.default_identity from the config)\n"
    )
}

/// Runs one supervised reader for the lifetime of the process.
pub struct Controller<S> {
    config: RfidConfig,
    exchange: String,
    sink: S,
}

impl<S: EventSink + Clone> Controller<S> {
    pub fn new(config: RfidConfig, exchange: impl Into<String>, sink: S) -> Self {
        Self {
            config,
            exchange: exchange.into(),
            sink,
        }
    }

    /// The identity to run: the requested one, else the configured default.
    pub fn identity(&self, requested: Option<SensorIdentity>) -> SensorIdentity {
        requested.unwrap_or_else(|| self.config.default_identity.clone())
    }

    /// Start the reader and wait until it ends or `shutdown` turns `true`.
    ///
    /// On shutdown the supervisor is stopped, so in-flight events get the
    /// configured drain time before the reader is reported as stopped.
    pub async fn run(
        &self,
        identity: Option<SensorIdentity>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Termination, SupervisorError> {
        let identity = self.identity(identity);
        info!(identity = %identity, "Selected sensor");

        let mut supervisor =
            Supervisor::new(self.config.clone(), self.exchange.clone(), self.sink.clone());
        supervisor.start(&identity)?;

        tokio::select! {
            termination = supervisor.wait() => termination,
            _ = stop_requested(&mut shutdown) => supervisor.stop().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::supervisor::TerminationReason;
    use gatesight_bridge_framework::{BridgeError, Destination, Event};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(Destination, Event)>>,
    }

    impl EventSink for RecordingSink {
        async fn publish(
            &self,
            destination: &Destination,
            event: &Event,
        ) -> Result<(), BridgeError> {
            self.published
                .lock()
                .unwrap()
                .push((destination.clone(), event.clone()));
            Ok(())
        }
    }

    fn shell(script: &str) -> RfidConfig {
        RfidConfig {
            reader: ReaderConfig {
                binary: "sh".into(),
                args: vec!["-c".to_string(), script.to_string(), "reader".to_string()],
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_invocation_from_args() {
        assert_eq!(Invocation::from_args(Vec::<String>::new()), Invocation::Run(None));
        assert_eq!(
            Invocation::from_args(["2"]),
            Invocation::Run(Some(SensorIdentity::new("2")))
        );
        assert_eq!(Invocation::from_args(["1", "2"]), Invocation::Usage);
        assert_eq!(Invocation::from_args(["1", "2", "3"]), Invocation::Usage);
    }

    #[test]
    fn test_usage_is_two_lines() {
        let text = usage("amqp-bridge-rfid");
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("usage: amqp-bridge-rfid"));
        assert!(text.contains("default_identity"));
    }

    #[test]
    fn test_default_identity() {
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(RfidConfig::default(), "ex_sensors", sink);
        assert_eq!(controller.identity(None), SensorIdentity::new("1"));
        assert_eq!(controller.identity(Some("7".into())), SensorIdentity::new("7"));
    }

    #[tokio::test]
    async fn test_run_without_identity_uses_default() {
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(shell("echo \"$1 $2\""), "ex_sensors", sink.clone());
        let (_tx, shutdown) = watch::channel(false);

        let termination = controller.run(None, shutdown).await.unwrap();

        assert_eq!(termination.reason, TerminationReason::EndOfStream);
        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.routing_key, "event.rfid.1");
        assert_eq!(published[0].1.data, "tag_id:3 2");
    }

    #[tokio::test]
    async fn test_no_identity_and_unknown_identity_drive_same_pins() {
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(shell("echo \"$1 $2\""), "ex_sensors", sink.clone());

        let (_tx, shutdown) = watch::channel(false);
        controller.run(None, shutdown).await.unwrap();
        let (_tx, shutdown) = watch::channel(false);
        controller.run(Some("front-door".into()), shutdown).await.unwrap();

        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1.data, published[1].1.data);
        assert_eq!(published[1].0.routing_key, "event.rfid.front-door");
    }

    #[tokio::test]
    async fn test_shutdown_stops_reader() {
        let sink = Arc::new(RecordingSink::default());
        let config = shell("while :; do sleep 0.05; done");
        let controller = Controller::new(config, "ex_sensors", sink);
        let (tx, shutdown) = watch::channel(false);

        let run =
            tokio::spawn(async move { controller.run(Some("2".into()), shutdown).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let termination = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("controller did not stop")
            .unwrap()
            .unwrap();
        assert_eq!(termination.reason, TerminationReason::Stopped);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_returned() {
        let mut config = RfidConfig::default();
        config.reader.binary = "/nonexistent/rfid".into();
        let sink = Arc::new(RecordingSink::default());
        let controller = Controller::new(config, "ex_sensors", sink.clone());
        let (_tx, shutdown) = watch::channel(false);

        let result = controller.run(None, shutdown).await;

        assert!(matches!(result, Err(SupervisorError::Spawn { .. })));
        assert!(sink.published.lock().unwrap().is_empty());
    }
}
