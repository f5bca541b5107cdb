use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kafka_types::{Message, OffsetMarker};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer as RdkafkaConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage as RdkafkaBorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info, trace};

use crate::bootstrap::{bootstrap_brokers, Coordinator};
use crate::client::LowLevelClient;
use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// Fetch client delegating to librdkafka.
///
/// Uses a [`BaseConsumer`] with manual partition assignment: every fetch
/// assigns exactly the requested topic-partition-offset, so no group
/// membership or committed offsets are involved. librdkafka already returns
/// flat, offset-corrected records.
pub struct RdKafkaClient {
    config: FetchConfig,
    coordinator: Arc<dyn Coordinator>,
    consumer: Option<BaseConsumer>,
}

impl RdKafkaClient {
    pub fn new(config: FetchConfig, coordinator: Arc<dyn Coordinator>) -> Self {
        Self {
            config,
            coordinator,
            consumer: None,
        }
    }

    fn consumer(&self) -> Result<&BaseConsumer> {
        self.consumer.as_ref().ok_or(Error::NotInitialized)
    }

    fn client_config(&self, brokers: &str) -> ClientConfig {
        let config = &self.config;
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", brokers)
            .set("client.id", &config.client_id)
            // Required by librdkafka's consumer even though no group is joined
            .set("group.id", &config.client_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "true")
            // Surface out-of-range offsets to the caller instead of silently resetting
            .set("auto.offset.reset", "error")
            .set("socket.timeout.ms", config.socket_timeout_ms.to_string())
            .set(
                "socket.connection.setup.timeout.ms",
                config.socket_timeout_ms.max(1000).to_string(),
            )
            .set(
                "fetch.message.max.bytes",
                config.fetch_message_max_bytes.to_string(),
            )
            .set("fetch.min.bytes", config.fetch_min_bytes.max(1).to_string())
            .set("fetch.wait.max.ms", config.fetch_wait_max_ms.to_string());
        client_config
    }
}

fn to_message(msg: &RdkafkaBorrowedMessage) -> Message {
    Message::new(
        msg.topic(),
        msg.partition(),
        msg.offset(),
        msg.key().map(|k| k.to_vec()),
        msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
    )
}

impl LowLevelClient for RdKafkaClient {
    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        let brokers = bootstrap_brokers(self.coordinator.as_ref())?.join(",");

        let consumer: BaseConsumer = self.client_config(&brokers).create()?;
        self.consumer = Some(consumer);

        info!("Initialized {self} with bootstrap brokers {brokers}");
        Ok(())
    }

    fn fetch(&mut self, topic: &str, partition: i32, offset: i64) -> Result<Vec<Message>> {
        trace!(topic, partition, offset, "Fetching");
        let consumer = self.consumer()?;

        let mut assignment = TopicPartitionList::new();
        assignment.add_partition_offset(topic, partition, Offset::Offset(offset))?;
        consumer.assign(&assignment)?;

        let max_bytes = self.config.fetch_message_max_bytes.max(0) as usize;
        let mut messages = Vec::new();
        let mut fetched_bytes = 0;
        // Wait for the first record only; afterwards drain what is already buffered.
        let mut wait = self.config.socket_timeout();

        loop {
            match consumer.poll(wait) {
                None => break,
                Some(Err(KafkaError::PartitionEOF(_))) => break,
                Some(Err(e)) if messages.is_empty() => return Err(e.into()),
                Some(Err(e)) => {
                    debug!("Stopping fetch of {topic}:{partition} early: {e}");
                    break;
                }
                Some(Ok(msg)) => {
                    if msg.topic() != topic || msg.partition() != partition {
                        continue;
                    }
                    fetched_bytes += msg.payload().map_or(0, <[u8]>::len)
                        + msg.key().map_or(0, <[u8]>::len);
                    messages.push(to_message(&msg));
                    wait = Duration::ZERO;
                    if fetched_bytes >= max_bytes {
                        break;
                    }
                }
            }
        }

        if messages.is_empty() {
            debug!("No new messages in {topic}:{partition} at offset {offset}");
        }
        Ok(messages)
    }

    fn is_offset_out_of_range(&self, err: &Error) -> bool {
        matches!(
            err,
            Error::Kafka(KafkaError::MessageConsumption(
                RDKafkaErrorCode::OffsetOutOfRange | RDKafkaErrorCode::AutoOffsetReset
            ))
        )
    }

    fn get_available_offset(
        &mut self,
        topic: &str,
        partition: i32,
        marker: OffsetMarker,
    ) -> Result<i64> {
        let (low, high) =
            self.consumer()?
                .fetch_watermarks(topic, partition, self.config.socket_timeout())?;
        let offset = match marker {
            OffsetMarker::Smallest => low,
            OffsetMarker::Largest => high,
        };
        debug!("{marker} offset for {topic}:{partition} is {offset}");
        Ok(offset)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(consumer) = self.consumer.take() {
            consumer.unassign()?;
            // Dropping the consumer blocks until librdkafka has shut it down
            drop(consumer);
            info!("Closed {self}");
        }
        Ok(())
    }
}

impl fmt::Display for RdKafkaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("rdkafka client")
    }
}
