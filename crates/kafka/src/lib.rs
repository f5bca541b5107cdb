//! Low-level Kafka fetch client for consumers that manage their own offsets.
//!
//! Features:
//!
//! - One fetch per call: fetch a single topic-partition at an explicit offset, no consumer group
//! - Two interchangeable backends behind the [`LowLevelClient`] trait:
//!   a native wire-protocol client over pooled sockets, and an `rdkafka` client
//! - Error classification: detect out-of-range offsets and resolve the earliest/latest offset
//! - Message-set decoding with offset correction and compressed-batch unwrapping

/// Broker discovery through a pluggable coordinator
pub mod bootstrap;

/// The backend-neutral client trait and the backend factory
pub mod client;
pub mod config;

/// Backend built on librdkafka
pub mod connector;
pub mod error;

/// Backend speaking the Kafka binary protocol directly
pub mod wire;

// Re-export main types for easy access
pub use bootstrap::{bootstrap_brokers, Coordinator, StaticCoordinator};
pub use client::{new_client, LowLevelClient};
pub use config::{Backend, FetchConfig};
pub use connector::RdKafkaClient;
pub use error::{Error, Result};
pub use kafka_types::{BrokerInfo, Message, OffsetMarker};
pub use wire::{KafkaCode, WireClient};
