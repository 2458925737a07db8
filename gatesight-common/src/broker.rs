use lapin::{Connection, ConnectionProperties};

use crate::config::BrokerConfig;
use crate::error::{Error, Result};

/// Connect to the AMQP broker using the provided configuration.
///
/// Connection setup (TCP, AMQP handshake, PLAIN login) is bounded by
/// `connect_timeout_ms`.
pub async fn connect(config: &BrokerConfig) -> Result<Connection> {
    tracing::debug!(
        endpoint = %config.endpoint(),
        vhost = %config.vhost,
        username = %config.username,
        "Connecting to broker"
    );

    let connecting = Connection::connect_uri(config.amqp_uri(), ConnectionProperties::default());

    let connection = tokio::time::timeout(config.connect_timeout(), connecting)
        .await
        .map_err(|_| Error::ConnectTimeout {
            endpoint: config.endpoint(),
            timeout_ms: config.connect_timeout_ms,
        })??;

    tracing::debug!(endpoint = %config.endpoint(), "Connected to broker");

    Ok(connection)
}
