//! Legacy message-set decoding (message format magic 0 and 1).
//!
//! A message set is a sequence of `offset:i64 | size:i32 | message` entries.
//! Each message is `crc:u32 | magic:i8 | attributes:i8 | [timestamp:i64] |
//! key:bytes | value:bytes`, where the timestamp is only present for magic 1
//! and the CRC covers everything after itself. A compressed message carries
//! a whole inner message set in its value.

use std::io::Read;

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use kafka_types::Message;
use tracing::trace;

use crate::error::{Error, Result};
use crate::wire::protocol::Reader;

const CODEC_MASK: i8 = 0x07;
const CODEC_NONE: i8 = 0;
const CODEC_GZIP: i8 = 1;

/// `offset` + `size` prefix of every entry.
const ENTRY_HEADER_LEN: usize = 12;

/// One entry of a message set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    /// Inner entries of a compressed wrapper, with absolute offsets
    pub nested: Option<Vec<MessageEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageSet {
    pub entries: Vec<MessageEntry>,
}

impl MessageSet {
    /// Decode a raw message set.
    ///
    /// Brokers cut the set at `max_bytes`, so the last entry may be
    /// incomplete; decoding stops there without an error. A compressed
    /// wrapper may inflate to at most `max_inflated` bytes.
    pub fn decode(raw: Bytes, max_inflated: usize) -> Result<Self> {
        let mut r = Reader::new(raw);
        let mut entries = Vec::new();

        while r.remaining() >= ENTRY_HEADER_LEN {
            let offset = r.i64("message offset")?;
            let size = r.i32("message size")?;
            if size < 0 {
                return Err(Error::Protocol(format!(
                    "negative message size {size} at offset {offset}"
                )));
            }
            if size as usize > r.remaining() {
                trace!(offset, size, "Dropping partial trailing message");
                break;
            }
            let body = r.take(size as usize, "message")?;
            entries.push(decode_message(offset, body, max_inflated)?);
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn decode_message(offset: i64, body: Bytes, max_inflated: usize) -> Result<MessageEntry> {
    let mut r = Reader::new(body);
    let expected = r.u32("message crc")?;
    let checked = r.into_inner();
    let actual = crc32fast::hash(&checked);
    if expected != actual {
        return Err(Error::Protocol(format!(
            "CRC mismatch at offset {offset}: expected {expected:#010x}, computed {actual:#010x}"
        )));
    }

    let mut r = Reader::new(checked);
    let magic = r.i8("magic byte")?;
    if !(0..=1).contains(&magic) {
        return Err(Error::Protocol(format!(
            "unsupported message format version {magic} at offset {offset}"
        )));
    }
    let attributes = r.i8("attributes")?;
    if magic == 1 {
        r.i64("timestamp")?;
    }
    let key = r.bytes("message key")?;
    let value = r.bytes("message value")?;

    let nested = match attributes & CODEC_MASK {
        CODEC_NONE => None,
        CODEC_GZIP => {
            let compressed = value.clone().unwrap_or_default();
            let inflated = gunzip(&compressed, max_inflated, offset)?;
            let mut inner = MessageSet::decode(inflated, max_inflated)?.entries;
            if magic == 1 {
                rebase_offsets(offset, &mut inner);
            }
            Some(inner)
        }
        codec => return Err(Error::UnsupportedCompression(codec)),
    };

    Ok(MessageEntry {
        offset,
        key,
        value,
        nested,
    })
}

fn gunzip(compressed: &[u8], limit: usize, offset: i64) -> Result<Bytes> {
    let mut out = Vec::new();
    MultiGzDecoder::new(compressed)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(Error::Protocol(format!(
            "compressed message at offset {offset} inflates past {limit} bytes"
        )));
    }
    Ok(Bytes::from(out))
}

/// Magic-1 wrappers store inner offsets relative to the first inner message,
/// while the wrapper itself carries the absolute offset of the last one.
fn rebase_offsets(wrapper_offset: i64, inner: &mut [MessageEntry]) {
    let Some(last_relative) = inner.last().map(|e| e.offset) else {
        return;
    };
    let base = wrapper_offset - last_relative;
    for entry in inner {
        entry.offset += base;
    }
}

/// Drop every entry whose offset is below the requested one.
///
/// A broker may answer with a batch that starts before the requested offset;
/// those leading entries were already consumed by the caller. The same holds
/// inside a compressed wrapper, whose own offset is that of its last record.
pub fn filter_partition_data(set: &mut MessageSet, offset: i64) {
    set.entries.retain(|entry| entry.offset >= offset);
    for entry in &mut set.entries {
        if let Some(inner) = entry.nested.as_mut() {
            inner.retain(|inner| inner.offset >= offset);
        }
    }
}

/// Flatten a message set into records, expanding compressed wrappers into
/// their inner entries.
pub fn collect_messages(set: MessageSet, topic: &str, partition: i32) -> Vec<Message> {
    let mut messages = Vec::with_capacity(set.len());
    for entry in set.entries {
        match entry.nested {
            Some(inner) => messages.extend(
                inner
                    .into_iter()
                    .map(|inner| to_message(inner, topic, partition)),
            ),
            None => messages.push(to_message(entry, topic, partition)),
        }
    }
    messages
}

fn to_message(entry: MessageEntry, topic: &str, partition: i32) -> Message {
    Message::new(
        topic,
        partition,
        entry.offset,
        entry.key.map(|k| k.to_vec()),
        entry.value.map(|v| v.to_vec()).unwrap_or_default(),
    )
}
