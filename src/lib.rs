//! Kafka data plane library
//!
//! The consumer-side data plane of a Kafka pipeline: everything between a
//! scheduler deciding *which* partition to read from *which* offset, and the
//! application handling the records.
//!
//! # Features
//!
//! - Pooled broker connections: bounded, blocking, FIFO reuse ([`ConnectionPool`])
//! - Offset-addressed fetches: one topic-partition-offset per call, no consumer group ([`LowLevelClient`])
//! - Two backends: native wire protocol or librdkafka, selected by [`Backend`]
//! - Error classification: detect out-of-range offsets and resolve earliest/latest offsets
//! - Avro payloads: schema-registry wire envelope encoding and decoding ([`avro`])
//!
//! # Crates
//!
//! - `kafka_types` - records, broker endpoints and offset markers
//! - `connection_pool` - the blocking TCP connection pool
//! - `kafka_lowlevel` - the fetch client trait and both backends
//! - `avro_codec` - the Avro encoder/decoder and schema registry client
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use kafka_dataplane::{connect, FetchConfig, OffsetMarker, StaticCoordinator};
//!
//! # fn main() -> anyhow::Result<()> {
//! let coordinator = Arc::new(StaticCoordinator::parse("localhost:9092")?);
//! let mut client = connect(FetchConfig::default(), coordinator)?;
//!
//! let mut offset = client.get_available_offset("events", 0, OffsetMarker::Smallest)?;
//! for message in client.fetch("events", 0, offset)? {
//!     offset = message.offset + 1;
//! }
//! client.close()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use anyhow::Context;

pub use avro_codec as avro;
pub use connection_pool::{ConnectionPool, PoolStats};
pub use kafka_lowlevel::{
    bootstrap_brokers, new_client, Backend, Coordinator, Error, FetchConfig, KafkaCode,
    LowLevelClient, RdKafkaClient, StaticCoordinator, WireClient,
};
pub use kafka_types::{BrokerInfo, Message, OffsetMarker};

/// Build the configured backend and initialize it.
pub fn connect(
    config: FetchConfig,
    coordinator: Arc<dyn Coordinator>,
) -> anyhow::Result<Box<dyn LowLevelClient>> {
    let mut client = new_client(config, coordinator);
    client
        .initialize()
        .with_context(|| format!("Failed to initialize {client}"))?;
    tracing::debug!("Connected {client}");
    Ok(client)
}
