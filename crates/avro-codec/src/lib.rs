//! Avro codec for Kafka record payloads backed by a schema registry.
//!
//! Encoded payloads use the registry wire envelope:
//!
//! | bytes | content |
//! |---|---|
//! | 0 | magic byte `0x00` |
//! | 1..5 | schema id, u32 big-endian |
//! | 5.. | Avro binary encoding of the value |
//!
//! The encoder only accepts records and registers their schema under
//! `<record name>-value`. The decoder accepts any schema the registry knows.

mod datum;
mod decoder;
mod encoder;
pub mod error;
mod registry;


pub use apache_avro::types::Value;
pub use apache_avro::Schema;
pub use datum::{Datum, GenericRecord};
pub use decoder::KafkaAvroDecoder;
pub use encoder::KafkaAvroEncoder;
pub use error::{Error, Result};
pub use registry::{CachedSchemaRegistryClient, SchemaRegistry};

pub(crate) const MAGIC_BYTE: u8 = 0;
/// Magic byte plus schema id
pub(crate) const HEADER_LEN: usize = 5;
