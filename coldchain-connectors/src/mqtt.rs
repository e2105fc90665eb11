//! MQTT ingestion connector.
//!
//! Subscribes to a reading topic tree and turns publishes into
//! [`RawReading`]s for the pipeline. Malformed payloads are counted and
//! logged, never fatal - one bad publisher must not stall the fleet.
//! Reconnects are driven by polling the rumqttc event loop; the
//! subscription is replayed on every broker acknowledgment, and a Last
//! Will marks the gateway offline if the connection drops uncleanly.

use std::time::Duration;

use rumqttc::{AsyncClient, ConnectionError, Event as MqttEvent, EventLoop, LastWill, MqttOptions, Packet};
use thiserror::Error;

use coldchain_core::reading::RawReading;
use coldchain_schemas::{ReadingPayload, SchemaError};

pub use rumqttc::QoS;

/// MQTT-specific errors.
#[derive(Debug, Error)]
pub enum MqttError {
    /// Broker request failed.
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("mqtt connection error: {0}")]
    Connection(#[from] ConnectionError),
}

/// MQTT ingestion configuration.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker hostname.
    pub broker_host: String,
    /// Broker port.
    pub broker_port: u16,
    /// Client identifier.
    pub client_id: String,
    /// Topic filter for readings.
    pub topic_filter: String,
    /// Subscription QoS.
    pub qos: QoS,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Last Will topic and payload, published by the broker if this
    /// client drops uncleanly.
    pub last_will: Option<(String, Vec<u8>)>,
    /// Client request channel capacity.
    pub channel_capacity: usize,
    /// Pause between reconnect attempts after a connection error.
    pub reconnect_delay: Duration,
}

impl MqttConfig {
    /// Configuration for a broker, with the default reading topic tree.
    pub fn new(broker_host: impl Into<String>, broker_port: u16, client_id: impl Into<String>) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port,
            client_id: client_id.into(),
            topic_filter: "coldchain/readings/#".into(),
            qos: QoS::AtLeastOnce,
            keep_alive: Duration::from_secs(30),
            last_will: None,
            channel_capacity: 64,
            reconnect_delay: Duration::from_secs(1),
        }
    }

    /// Set the topic filter.
    pub fn topic_filter(mut self, filter: impl Into<String>) -> Self {
        self.topic_filter = filter.into();
        self
    }

    /// Set the subscription QoS.
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set a Last Will message.
    pub fn last_will(mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.last_will = Some((topic.into(), payload.into()));
        self
    }
}

/// Ingestion statistics.
#[derive(Debug, Default, Clone)]
pub struct IngestStats {
    /// Publishes received.
    pub received: u64,
    /// Publishes that failed to parse as reading payloads.
    pub malformed: u64,
    /// Broker (re)connections acknowledged.
    pub connections: u32,
}

/// MQTT reading source.
pub struct MqttIngest {
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
    stats: IngestStats,
}

impl MqttIngest {
    /// Create the client. The connection is established lazily by the
    /// first [`next_reading`](Self::next_reading) poll.
    pub fn connect(config: MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(config.keep_alive);
        if let Some((topic, payload)) = &config.last_will {
            options.set_last_will(LastWill::new(topic, payload.clone(), config.qos, false));
        }

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        Self {
            client,
            eventloop,
            config,
            stats: IngestStats::default(),
        }
    }

    /// Ingestion statistics so far.
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Wait for the next parseable reading.
    ///
    /// Drives the event loop: broker acknowledgments replay the
    /// subscription, connection errors pause and retry, malformed
    /// publishes are skipped with a counter bump.
    pub async fn next_reading(&mut self) -> Result<RawReading, MqttError> {
        loop {
            match self.eventloop.poll().await {
                Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                    self.stats.connections += 1;
                    self.client
                        .subscribe(&self.config.topic_filter, self.config.qos)
                        .await?;
                }
                Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                    self.stats.received += 1;
                    match parse_reading(&publish.payload) {
                        Ok(reading) => return Ok(reading),
                        Err(e) => {
                            self.stats.malformed += 1;
                            log::warn!("malformed reading on {}: {}", publish.topic, e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("mqtt connection error, retrying: {e}");
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }
}

fn parse_reading(payload: &[u8]) -> Result<RawReading, SchemaError> {
    let payload: ReadingPayload = serde_json::from_slice(payload)?;
    payload.to_reading()
}
