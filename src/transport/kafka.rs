//! Event Hubs over its Kafka endpoint, using rdkafka.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, Headers, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::{ClientConfig, Message};
use tracing::{debug, info, warn};

use super::{Connector, EventBatch, EventProducer, EventSource};
use crate::config::{Config, HubConfig};
use crate::event::{EventData, Properties, ReceivedEvent};
use crate::headers::HeaderValue;
use crate::{Error, Result};

/// SASL user name Event Hubs expects when the password is a connection string.
const CONNECTION_STRING_USER: &str = "$ConnectionString";

/// Client settings shared by the producer and the consumer.
pub fn base_client_config(hub: &HubConfig) -> Result<ClientConfig> {
    let mut client = ClientConfig::new();
    client.set("bootstrap.servers", hub.bootstrap_servers()?);

    if hub.uses_namespace_endpoint() {
        client
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanism", "PLAIN")
            .set("sasl.username", CONNECTION_STRING_USER)
            .set("sasl.password", &hub.connection_string);
    }

    Ok(client)
}

/// Opens rdkafka clients from a validated [`Config`].
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    config: Config,
}

impl KafkaConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Connector for KafkaConnector {
    type Producer = KafkaEventProducer;
    type Source = KafkaEventSource;

    fn open_producer(&self) -> Result<KafkaEventProducer> {
        KafkaEventProducer::new(&self.config)
    }

    fn open_source(&self) -> Result<KafkaEventSource> {
        KafkaEventSource::new(&self.config)
    }
}

pub struct KafkaEventProducer {
    producer: FutureProducer,
    topic: String,
    max_batch_bytes: usize,
    message_timeout: Duration,
}

impl KafkaEventProducer {
    pub fn new(config: &Config) -> Result<Self> {
        let producer: FutureProducer = base_client_config(&config.hub)?
            .set("compression.type", &config.producer.compression)
            .set("acks", &config.producer.acks)
            .set("linger.ms", config.producer.linger_ms.to_string())
            .set("message.max.bytes", config.producer.max_batch_bytes.to_string())
            .set(
                "message.timeout.ms",
                config.producer.message_timeout_ms.to_string(),
            )
            .create()
            .map_err(Error::Kafka)?;

        info!(hub = %config.hub.hub_name, "Created Kafka producer");

        Ok(Self {
            producer,
            topic: config.hub.hub_name.clone(),
            max_batch_bytes: config.producer.max_batch_bytes,
            message_timeout: Duration::from_millis(config.producer.message_timeout_ms),
        })
    }
}

/// Encodes every property of `event` as a Kafka header.
pub fn encode_headers(event: &EventData) -> OwnedHeaders {
    event
        .properties
        .iter()
        .fold(OwnedHeaders::new(), |headers, (name, value)| {
            let encoded = value.encode();
            headers.insert(Header {
                key: name,
                value: Some(&encoded[..]),
            })
        })
}

#[async_trait]
impl EventProducer for KafkaEventProducer {
    async fn create_batch(&mut self) -> Result<EventBatch> {
        Ok(EventBatch::new(self.max_batch_bytes))
    }

    async fn send_batch(&mut self, batch: &EventBatch) -> Result<()> {
        let deliveries = batch.iter().map(|event| {
            let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(&self.topic)
                .payload(&event.body[..])
                .headers(encode_headers(event));
            if let Some(key) = event.partition_key.as_deref() {
                record = record.key(key);
            }
            self.producer.send(record, self.message_timeout)
        });

        // Wait for every delivery report so the whole batch is settled before returning.
        let results = futures::future::join_all(deliveries).await;

        let mut first_error = None;
        for result in results {
            match result {
                Ok((partition, offset)) => {
                    debug!(partition, offset, "Delivered event");
                }
                Err((e, _)) => {
                    warn!("Failed to deliver event: {}", e);
                    first_error.get_or_insert(Error::Kafka(e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Flushing Kafka producer");
        self.producer.flush(self.message_timeout)?;
        Ok(())
    }
}

pub struct KafkaEventSource {
    consumer: StreamConsumer,
    hub_name: String,
    subscribed: bool,
}

impl KafkaEventSource {
    /// Subscribes to the hub with the configured consumer group.
    pub fn new(config: &Config) -> Result<Self> {
        let consumer: StreamConsumer = base_client_config(&config.hub)?
            .set("group.id", &config.hub.consumer_group)
            .set("auto.offset.reset", &config.consumer.auto_offset_reset)
            .set(
                "session.timeout.ms",
                config.consumer.session_timeout_ms.to_string(),
            )
            .set("enable.auto.commit", "true")
            .create()
            .map_err(Error::Kafka)?;

        consumer.subscribe(&[config.hub.hub_name.as_str()])?;

        info!(
            hub = %config.hub.hub_name,
            consumer_group = %config.hub.consumer_group,
            "Subscribed to hub"
        );

        Ok(Self {
            consumer,
            hub_name: config.hub.hub_name.clone(),
            subscribed: true,
        })
    }
}

/// Converts a Kafka message into a [`ReceivedEvent`].
///
/// The Kafka offset doubles as the sequence number and the offset token.
/// Headers that do not decode as typed values are kept as raw bytes.
pub fn received_event_from<M: Message>(message: &M) -> ReceivedEvent {
    let mut properties = Properties::new();

    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            let raw = header.value.unwrap_or_default();
            let value = HeaderValue::decode(raw).unwrap_or_else(|e| {
                debug!(header = header.key, "Keeping undecodable header as bytes: {}", e);
                HeaderValue::Bytes(bytes::Bytes::copy_from_slice(raw))
            });
            if let Err(e) = properties.add(header.key, value) {
                warn!("Skipping header: {}", e);
            }
        }
    }

    ReceivedEvent {
        partition_id: message.partition().to_string(),
        sequence_number: message.offset(),
        enqueued_time_ms: message.timestamp().to_millis().unwrap_or_default(),
        body: message
            .payload()
            .map(bytes::Bytes::copy_from_slice)
            .unwrap_or_default(),
        partition_key: message
            .key()
            .map(|key| String::from_utf8_lossy(key).into_owned()),
        offset: message.offset().to_string(),
        properties,
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn next_event(&mut self) -> Result<Option<ReceivedEvent>> {
        let message = self.consumer.recv().await?;
        Ok(Some(received_event_from(&message)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.subscribed {
            self.consumer.unsubscribe();
            self.subscribed = false;
            info!(hub = %self.hub_name, "Closed subscription");
        }
        Ok(())
    }
}
