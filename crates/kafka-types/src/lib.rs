//! Shared types for the Kafka low-level consumer.
//!
//! This crate holds the value types that cross crate boundaries:
//!
//! - [`Message`] - a single fetched record, produced by the fetch client's decode pipeline
//! - [`BrokerInfo`] - a broker endpoint as reported by the cluster coordinator
//! - [`OffsetMarker`] - the logical "smallest" / "largest" offset boundary
//!
//! # Dependency Direction
//!
//! ```text
//! kafka-types (this crate)
//!   ^
//!   |
//! kafka-lowlevel (fetch client, both backends)
//! ```

pub mod broker;
pub mod error;
pub mod message;
pub mod offset;

pub use broker::BrokerInfo;
pub use error::{KafkaTypesError, Result};
pub use message::Message;
pub use offset::OffsetMarker;
