//! Native Kafka protocol backend.
//!
//! Speaks Metadata v0, Fetch v0 and Offsets v0 directly and decodes the
//! legacy message-set format (magic 0 and 1). Brokers that dropped these
//! versions (Kafka 4.0 and later) need the `rdkafka` backend instead.

mod client;
pub mod message_set;
pub mod protocol;

pub use client::WireClient;
pub use message_set::{MessageEntry, MessageSet};
pub use protocol::KafkaCode;
