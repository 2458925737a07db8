//! Event publisher for the AMQP broker.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Connection};

use gatesight_common::{CONTENT_TYPE, Destination, Event, connect, encode};

use crate::BrokerConfig;
use crate::error::{BridgeError, Result};

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// AMQP delivery mode for messages the broker should write to disk.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Something that accepts formatted events for delivery.
///
/// [`Publisher`] is the broker-backed implementation; bridges take any sink
/// so their dispatch logic can run without a broker.
pub trait EventSink: Send + Sync + 'static {
    /// Deliver one event to `destination`.
    fn publish(
        &self,
        destination: &Destination,
        event: &Event,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<S: EventSink> EventSink for Arc<S> {
    fn publish(
        &self,
        destination: &Destination,
        event: &Event,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).publish(destination, event)
    }
}

/// Publisher for sending events to the broker.
///
/// Every call to [`publish`](Self::publish) opens its own connection and
/// channel, sends exactly one message, and closes both again, whatever the
/// outcome. Nothing is shared between calls, so concurrent publishes never
/// contend and no half-open connection outlives a burst of traffic.
#[derive(Clone, Debug)]
pub struct Publisher {
    broker: BrokerConfig,
}

impl Publisher {
    /// Create a new publisher.
    pub fn new(broker: BrokerConfig) -> Self {
        Self { broker }
    }

    /// Publish one event.
    ///
    /// Logs exactly one line: the payload on success, or the payload and the
    /// cause on failure. Failures are returned but never retried.
    pub async fn publish(&self, destination: &Destination, event: &Event) -> Result<()> {
        let payload = encode(event)?;
        let body = String::from_utf8_lossy(&payload);

        match self.send(destination, &payload).await {
            Ok(()) => {
                tracing::info!(
                    exchange = %destination.exchange,
                    routing_key = %destination.routing_key,
                    payload = %body,
                    "Sent event"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    exchange = %destination.exchange,
                    routing_key = %destination.routing_key,
                    payload = %body,
                    error = %e,
                    "Failed to publish event"
                );
                Err(BridgeError::Publish {
                    destination: destination.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Message properties applied to every event.
    fn properties(&self) -> BasicProperties {
        let properties = BasicProperties::default().with_content_type(CONTENT_TYPE.into());
        if self.broker.persistent {
            properties.with_delivery_mode(DELIVERY_MODE_PERSISTENT)
        } else {
            properties
        }
    }

    /// Connect, publish on a fresh channel, and close the connection.
    async fn send(
        &self,
        destination: &Destination,
        payload: &[u8],
    ) -> gatesight_common::Result<()> {
        let connection = connect(&self.broker).await?;

        let outcome = publish_on(&connection, destination, payload, self.properties()).await;

        if let Err(e) = connection.close(REPLY_SUCCESS, "OK").await {
            tracing::debug!(error = %e, "Error closing broker connection");
        }

        outcome.map_err(gatesight_common::Error::from)
    }
}

impl EventSink for Publisher {
    fn publish(
        &self,
        destination: &Destination,
        event: &Event,
    ) -> impl Future<Output = Result<()>> + Send {
        Publisher::publish(self, destination, event)
    }
}

/// Open a channel, publish a single message, and close the channel.
async fn publish_on(
    connection: &Connection,
    destination: &Destination,
    payload: &[u8],
    properties: BasicProperties,
) -> std::result::Result<(), lapin::Error> {
    let channel = connection.create_channel().await?;

    let published = async {
        channel
            .basic_publish(
                &destination.exchange,
                &destination.routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;
        Ok::<(), lapin::Error>(())
    }
    .await;

    if let Err(e) = channel.close(REPLY_SUCCESS, "OK").await {
        tracing::debug!(error = %e, "Error closing broker channel");
    }

    published
}

/// Statistics from a series of publish attempts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Number of successfully published events.
    pub success: usize,
    /// Number of failed publishes.
    pub failed: usize,
}

impl PublishStats {
    /// Total number of attempted publishes.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

/// Thread-safe publish counters shared by concurrent workers.
#[derive(Debug, Default)]
pub struct PublishCounters {
    success: AtomicUsize,
    failed: AtomicUsize,
}

impl PublishCounters {
    /// Record the outcome of one publish attempt.
    pub fn record<T, E>(&self, outcome: &std::result::Result<T, E>) {
        match outcome {
            Ok(_) => self.success.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Current totals.
    pub fn snapshot(&self) -> PublishStats {
        PublishStats {
            success: self.success.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
