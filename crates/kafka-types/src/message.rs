//! Kafka message types.
//!
//! A [`Message`] is what the fetch client hands back to its caller. Both
//! backends produce exactly this shape, whatever their wire representation.

/// A single record fetched from a topic-partition.
///
/// Records are created by the fetch client for each `fetch` call and are
/// owned by the caller afterwards. They are never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Record key (if any)
    pub key: Option<Vec<u8>>,
    /// Record value; a null value on the wire becomes an empty vector
    pub value: Vec<u8>,
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: Option<Vec<u8>>,
        value: Vec<u8>,
    ) -> Self {
        Self {
            key,
            value,
            topic: topic.into(),
            partition,
            offset,
        }
    }
}
