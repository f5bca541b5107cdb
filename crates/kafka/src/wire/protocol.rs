//! Kafka binary protocol: request framing and the three APIs the wire
//! client needs (Metadata, Fetch and Offsets, all at version 0).
//!
//! Every request is `size:i32 | api_key:i16 | api_version:i16 |
//! correlation_id:i32 | client_id:string | body`; every response is
//! `size:i32 | correlation_id:i32 | body`. All integers are big-endian.

use std::fmt;
use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub const API_KEY_FETCH: i16 = 1;
pub const API_KEY_OFFSETS: i16 = 2;
pub const API_KEY_METADATA: i16 = 3;
const API_VERSION: i16 = 0;

/// Offsets API time value for the earliest retained offset.
pub const EARLIEST_TIME: i64 = -2;
/// Offsets API time value for the next offset to be written.
pub const LATEST_TIME: i64 = -1;

/// Replica id used by ordinary consumers.
const CONSUMER_REPLICA_ID: i32 = -1;

/// Upper bound on a response frame; anything larger is a desynchronised stream.
const MAX_RESPONSE_SIZE: usize = 256 * 1024 * 1024;

/// Longest string an `i16` length prefix can describe.
pub const MAX_STRING_LEN: usize = i16::MAX as usize;

/// Non-zero error codes a broker can put in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KafkaCode {
    Unknown,
    OffsetOutOfRange,
    CorruptMessage,
    UnknownTopicOrPartition,
    InvalidMessageSize,
    LeaderNotAvailable,
    NotLeaderForPartition,
    RequestTimedOut,
    BrokerNotAvailable,
    ReplicaNotAvailable,
    MessageSizeTooLarge,
    NetworkException,
    Other(i16),
}

impl KafkaCode {
    /// Map a wire error code; `0` means "no error" and yields `None`.
    pub fn from_i16(code: i16) -> Option<Self> {
        let code = match code {
            0 => return None,
            -1 => Self::Unknown,
            1 => Self::OffsetOutOfRange,
            2 => Self::CorruptMessage,
            3 => Self::UnknownTopicOrPartition,
            4 => Self::InvalidMessageSize,
            5 => Self::LeaderNotAvailable,
            6 => Self::NotLeaderForPartition,
            7 => Self::RequestTimedOut,
            8 => Self::BrokerNotAvailable,
            9 => Self::ReplicaNotAvailable,
            10 => Self::MessageSizeTooLarge,
            13 => Self::NetworkException,
            other => Self::Other(other),
        };
        Some(code)
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Unknown => -1,
            Self::OffsetOutOfRange => 1,
            Self::CorruptMessage => 2,
            Self::UnknownTopicOrPartition => 3,
            Self::InvalidMessageSize => 4,
            Self::LeaderNotAvailable => 5,
            Self::NotLeaderForPartition => 6,
            Self::RequestTimedOut => 7,
            Self::BrokerNotAvailable => 8,
            Self::ReplicaNotAvailable => 9,
            Self::MessageSizeTooLarge => 10,
            Self::NetworkException => 13,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for KafkaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "error code {code}"),
            known => write!(f, "{known:?} ({})", known.as_i16()),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Frame a request body with its size prefix and request header.
pub fn encode_request(
    api_key: i16,
    correlation_id: i32,
    client_id: &str,
    body: &[u8],
) -> Result<Bytes> {
    let header_len = 2 + 2 + 4 + 2 + client_id.len();
    let mut buf = BytesMut::with_capacity(4 + header_len + body.len());
    buf.put_i32((header_len + body.len()) as i32);
    buf.put_i16(api_key);
    buf.put_i16(API_VERSION);
    buf.put_i32(correlation_id);
    put_string(&mut buf, client_id)?;
    buf.put_slice(body);
    Ok(buf.freeze())
}

/// Metadata request for the given topics; an empty slice asks for all topics.
pub fn metadata_request(topics: &[&str]) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    buf.put_i32(topics.len() as i32);
    for topic in topics {
        put_string(&mut buf, topic)?;
    }
    Ok(buf.freeze())
}

/// Fetch request carrying exactly one block: one topic, one partition.
pub fn fetch_request(
    topic: &str,
    partition: i32,
    offset: i64,
    max_wait_ms: i32,
    min_bytes: i32,
    max_bytes: i32,
) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    buf.put_i32(CONSUMER_REPLICA_ID);
    buf.put_i32(max_wait_ms);
    buf.put_i32(min_bytes);
    buf.put_i32(1);
    put_string(&mut buf, topic)?;
    buf.put_i32(1);
    buf.put_i32(partition);
    buf.put_i64(offset);
    buf.put_i32(max_bytes);
    Ok(buf.freeze())
}

/// Offsets request asking for a single offset at `time`
/// ([`EARLIEST_TIME`] or [`LATEST_TIME`]).
pub fn offsets_request(topic: &str, partition: i32, time: i64) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    buf.put_i32(CONSUMER_REPLICA_ID);
    buf.put_i32(1);
    put_string(&mut buf, topic)?;
    buf.put_i32(1);
    buf.put_i32(partition);
    buf.put_i64(time);
    buf.put_i32(1);
    Ok(buf.freeze())
}

fn put_string(buf: &mut BytesMut, s: &str) -> Result<()> {
    if s.len() > MAX_STRING_LEN {
        return Err(Error::Protocol(format!(
            "string of {} bytes exceeds the {MAX_STRING_LEN} byte limit",
            s.len()
        )));
    }
    buf.put_i16(s.len() as i16);
    buf.put_slice(s.as_bytes());
    Ok(())
}

// ============================================================================
// Transport
// ============================================================================

/// Write a framed request to the stream.
pub fn send_request<W: Write>(stream: &mut W, request: &[u8]) -> Result<()> {
    stream.write_all(request)?;
    stream.flush()?;
    Ok(())
}

/// Read one response frame and return its body (after the correlation id).
pub fn read_response<R: Read>(stream: &mut R, correlation_id: i32) -> Result<Bytes> {
    let mut size = [0u8; 4];
    stream.read_exact(&mut size)?;
    let size = i32::from_be_bytes(size);
    if size < 4 || size as usize > MAX_RESPONSE_SIZE {
        return Err(Error::Protocol(format!("invalid response size {size}")));
    }

    let mut frame = vec![0u8; size as usize];
    stream.read_exact(&mut frame)?;
    let mut frame = Bytes::from(frame);

    let received = frame.get_i32();
    if received != correlation_id {
        return Err(Error::Protocol(format!(
            "correlation id mismatch: expected {correlation_id}, got {received}"
        )));
    }
    Ok(frame)
}

// ============================================================================
// Responses
// ============================================================================

/// Bounds-checked big-endian reader over a response body.
pub(crate) struct Reader {
    buf: Bytes,
}

impl Reader {
    pub(crate) fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    fn ensure(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::Protocol(format!(
                "truncated data reading {what}: need {n} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn i8(&mut self, what: &str) -> Result<i8> {
        self.ensure(1, what)?;
        Ok(self.buf.get_i8())
    }

    pub(crate) fn i16(&mut self, what: &str) -> Result<i16> {
        self.ensure(2, what)?;
        Ok(self.buf.get_i16())
    }

    pub(crate) fn i32(&mut self, what: &str) -> Result<i32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_i32())
    }

    pub(crate) fn i64(&mut self, what: &str) -> Result<i64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_i64())
    }

    pub(crate) fn u32(&mut self, what: &str) -> Result<u32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn string(&mut self, what: &str) -> Result<String> {
        let len = self.i16(what)?;
        if len < 0 {
            return Ok(String::new());
        }
        let raw = self.take(len as usize, what)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| Error::Protocol(format!("{what} is not valid UTF-8")))
    }

    /// Length-prefixed byte string; a length of -1 is null.
    pub(crate) fn bytes(&mut self, what: &str) -> Result<Option<Bytes>> {
        let len = self.i32(what)?;
        if len < 0 {
            return Ok(None);
        }
        self.take(len as usize, what).map(Some)
    }

    /// Array element count. Each element takes at least `min_size` bytes,
    /// so a count the remaining body cannot hold is rejected up front.
    pub(crate) fn array_len(&mut self, what: &str, min_size: usize) -> Result<usize> {
        let count = self.i32(what)?.max(0) as usize;
        if count.saturating_mul(min_size.max(1)) > self.buf.remaining() {
            return Err(Error::Protocol(format!(
                "{what} {count} exceeds the {} remaining bytes",
                self.buf.remaining()
            )));
        }
        Ok(count)
    }

    pub(crate) fn take(&mut self, n: usize, what: &str) -> Result<Bytes> {
        self.ensure(n, what)?;
        Ok(self.buf.split_to(n))
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub(crate) fn into_inner(self) -> Bytes {
        self.buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMetadata {
    pub node_id: i32,
    pub host: String,
    pub port: i32,
}

impl BrokerMetadata {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub error: Option<KafkaCode>,
    pub id: i32,
    /// Node id of the leader, or -1 while a leader election is in progress
    pub leader: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub error: Option<KafkaCode>,
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataResponse {
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
}

impl MetadataResponse {
    pub fn decode(body: Bytes) -> Result<Self> {
        let mut r = Reader::new(body);

        let broker_count = r.array_len("broker count", 10)?;
        let mut brokers = Vec::with_capacity(broker_count);
        for _ in 0..broker_count {
            brokers.push(BrokerMetadata {
                node_id: r.i32("broker node id")?,
                host: r.string("broker host")?,
                port: r.i32("broker port")?,
            });
        }

        let topic_count = r.array_len("topic count", 8)?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            let error = KafkaCode::from_i16(r.i16("topic error code")?);
            let name = r.string("topic name")?;
            let partition_count = r.array_len("partition count", 18)?;
            let mut partitions = Vec::with_capacity(partition_count);
            for _ in 0..partition_count {
                let error = KafkaCode::from_i16(r.i16("partition error code")?);
                let id = r.i32("partition id")?;
                let leader = r.i32("partition leader")?;
                // replicas and isr are not needed for routing
                for what in ["replicas", "isr"] {
                    let n = r.array_len(what, 4)?;
                    r.take(n * 4, what)?;
                }
                partitions.push(PartitionMetadata { error, id, leader });
            }
            topics.push(TopicMetadata {
                error,
                name,
                partitions,
            });
        }

        Ok(Self { brokers, topics })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPartition {
    pub partition: i32,
    pub error: Option<KafkaCode>,
    pub high_watermark: i64,
    /// Raw message set, decoded separately by the message-set pipeline
    pub message_set: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTopic {
    pub name: String,
    pub partitions: Vec<FetchPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    pub topics: Vec<FetchTopic>,
}

impl FetchResponse {
    pub fn decode(body: Bytes) -> Result<Self> {
        let mut r = Reader::new(body);

        let topic_count = r.array_len("topic count", 6)?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            let name = r.string("topic name")?;
            let partition_count = r.array_len("partition count", 18)?;
            let mut partitions = Vec::with_capacity(partition_count);
            for _ in 0..partition_count {
                let partition = r.i32("partition id")?;
                let error = KafkaCode::from_i16(r.i16("partition error code")?);
                let high_watermark = r.i64("high watermark")?;
                let message_set = r.bytes("message set")?.unwrap_or_default();
                partitions.push(FetchPartition {
                    partition,
                    error,
                    high_watermark,
                    message_set,
                });
            }
            topics.push(FetchTopic { name, partitions });
        }

        Ok(Self { topics })
    }

    /// The block for one topic-partition, if the broker returned it.
    pub fn partition(&self, topic: &str, partition: i32) -> Option<&FetchPartition> {
        self.topics
            .iter()
            .filter(|t| t.name == topic)
            .flat_map(|t| t.partitions.iter())
            .find(|p| p.partition == partition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOffsets {
    pub partition: i32,
    pub error: Option<KafkaCode>,
    pub offsets: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicOffsets {
    pub name: String,
    pub partitions: Vec<PartitionOffsets>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetsResponse {
    pub topics: Vec<TopicOffsets>,
}

impl OffsetsResponse {
    pub fn decode(body: Bytes) -> Result<Self> {
        let mut r = Reader::new(body);

        let topic_count = r.array_len("topic count", 6)?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            let name = r.string("topic name")?;
            let partition_count = r.array_len("partition count", 10)?;
            let mut partitions = Vec::with_capacity(partition_count);
            for _ in 0..partition_count {
                let partition = r.i32("partition id")?;
                let error = KafkaCode::from_i16(r.i16("partition error code")?);
                let offset_count = r.array_len("offset count", 8)?;
                let offsets = (0..offset_count)
                    .map(|_| r.i64("offset"))
                    .collect::<Result<Vec<_>>>()?;
                partitions.push(PartitionOffsets {
                    partition,
                    error,
                    offsets,
                });
            }
            topics.push(TopicOffsets { name, partitions });
        }

        Ok(Self { topics })
    }

    pub fn partition(&self, topic: &str, partition: i32) -> Option<&PartitionOffsets> {
        self.topics
            .iter()
            .filter(|t| t.name == topic)
            .flat_map(|t| t.partitions.iter())
            .find(|p| p.partition == partition)
    }
}
