//! In-process broker speaking Metadata v0, Fetch v0 and Offsets v0.
//!
//! Serves a fixed set of partitions from a single node. Every accepted
//! connection is handled on its own thread until the client hangs up.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use kafka_dataplane::BrokerInfo;

const NODE_ID: i32 = 1;
const UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;

#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Raw message set returned for every fetch
    pub messages: Vec<u8>,
    /// Error code returned for fetches
    pub error: i16,
    pub earliest: i64,
    pub latest: i64,
}

#[derive(Debug, Default)]
pub struct State {
    pub partitions: HashMap<(String, i32), Partition>,
    pub connections: usize,
    pub metadata_requests: usize,
    /// (topic, partition, offset) of every fetch received
    pub fetches: Vec<(String, i32, i64)>,
    pub client_ids: Vec<String>,
    /// Hang up on the next fetch instead of answering it
    pub drop_next_fetch: bool,
}

pub struct MockBroker {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl MockBroker {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                accept_state.lock().unwrap().connections += 1;
                let conn_state = Arc::clone(&accept_state);
                thread::spawn(move || serve(stream, conn_state, port));
            }
        });

        Self { port, state }
    }

    pub fn info(&self) -> BrokerInfo {
        BrokerInfo::new("127.0.0.1", self.port)
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_partition(&self, topic: &str, partition: i32, data: Partition) {
        self.state()
            .partitions
            .insert((topic.to_string(), partition), data);
    }
}

fn serve(mut stream: TcpStream, state: Arc<Mutex<State>>, port: u16) {
    loop {
        let mut size = [0u8; 4];
        if stream.read_exact(&mut size).is_err() {
            return;
        }
        let mut frame = vec![0u8; i32::from_be_bytes(size) as usize];
        if stream.read_exact(&mut frame).is_err() {
            return;
        }

        let mut request = Bytes::from(frame);
        let api_key = request.get_i16();
        let _api_version = request.get_i16();
        let correlation_id = request.get_i32();
        let client_id = get_string(&mut request);
        state.lock().unwrap().client_ids.push(client_id);

        let body = match api_key {
            3 => metadata(&mut request, &state, port),
            1 => match fetch(&mut request, &state) {
                Some(body) => body,
                None => return,
            },
            2 => offsets(&mut request, &state),
            other => panic!("mock broker does not implement api key {other}"),
        };

        let mut response = BytesMut::new();
        response.put_i32(body.len() as i32 + 4);
        response.put_i32(correlation_id);
        response.put_slice(&body);
        if stream.write_all(&response).is_err() {
            return;
        }
    }
}

fn metadata(request: &mut Bytes, state: &Mutex<State>, port: u16) -> BytesMut {
    let count = request.get_i32();
    let requested: Vec<String> = (0..count).map(|_| get_string(request)).collect();

    let mut state = state.lock().unwrap();
    state.metadata_requests += 1;

    let topics = if requested.is_empty() {
        let mut all: Vec<String> = state.partitions.keys().map(|(t, _)| t.clone()).collect();
        all.sort();
        all.dedup();
        all
    } else {
        requested
    };

    let mut out = BytesMut::new();
    out.put_i32(1);
    out.put_i32(NODE_ID);
    put_string(&mut out, "127.0.0.1");
    out.put_i32(port as i32);

    out.put_i32(topics.len() as i32);
    for topic in topics {
        let mut partitions: Vec<i32> = state
            .partitions
            .keys()
            .filter(|(t, _)| *t == topic)
            .map(|(_, p)| *p)
            .collect();
        partitions.sort();

        out.put_i16(if partitions.is_empty() {
            UNKNOWN_TOPIC_OR_PARTITION
        } else {
            0
        });
        put_string(&mut out, &topic);
        out.put_i32(partitions.len() as i32);
        for partition in partitions {
            out.put_i16(0);
            out.put_i32(partition);
            out.put_i32(NODE_ID);
            // replicas, isr
            for _ in 0..2 {
                out.put_i32(1);
                out.put_i32(NODE_ID);
            }
        }
    }
    out
}

fn fetch(request: &mut Bytes, state: &Mutex<State>) -> Option<BytesMut> {
    let _replica_id = request.get_i32();
    let _max_wait = request.get_i32();
    let _min_bytes = request.get_i32();
    let _topic_count = request.get_i32();
    let topic = get_string(request);
    let _partition_count = request.get_i32();
    let partition = request.get_i32();
    let offset = request.get_i64();
    let _max_bytes = request.get_i32();

    let mut state = state.lock().unwrap();
    if state.drop_next_fetch {
        state.drop_next_fetch = false;
        return None;
    }
    state.fetches.push((topic.clone(), partition, offset));

    let data = state
        .partitions
        .get(&(topic.clone(), partition))
        .cloned()
        .unwrap_or(Partition {
            error: UNKNOWN_TOPIC_OR_PARTITION,
            ..Default::default()
        });

    let mut out = BytesMut::new();
    out.put_i32(1);
    put_string(&mut out, &topic);
    out.put_i32(1);
    out.put_i32(partition);
    out.put_i16(data.error);
    out.put_i64(data.latest);
    out.put_i32(data.messages.len() as i32);
    out.put_slice(&data.messages);
    Some(out)
}

fn offsets(request: &mut Bytes, state: &Mutex<State>) -> BytesMut {
    let _replica_id = request.get_i32();
    let _topic_count = request.get_i32();
    let topic = get_string(request);
    let _partition_count = request.get_i32();
    let partition = request.get_i32();
    let time = request.get_i64();
    let _max_offsets = request.get_i32();

    let state = state.lock().unwrap();
    let data = state.partitions.get(&(topic.clone(), partition));

    let mut out = BytesMut::new();
    out.put_i32(1);
    put_string(&mut out, &topic);
    out.put_i32(1);
    out.put_i32(partition);
    match data {
        Some(data) => {
            out.put_i16(0);
            out.put_i32(1);
            out.put_i64(if time == -2 { data.earliest } else { data.latest });
        }
        None => {
            out.put_i16(UNKNOWN_TOPIC_OR_PARTITION);
            out.put_i32(0);
        }
    }
    out
}

fn get_string(buf: &mut Bytes) -> String {
    let len = buf.get_i16();
    if len < 0 {
        return String::new();
    }
    let raw = buf.split_to(len as usize);
    String::from_utf8(raw.to_vec()).unwrap()
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_i16(s.len() as i16);
    buf.put_slice(s.as_bytes());
}

// ============================================================================
// Message sets
// ============================================================================

/// One magic-0 message-set entry.
pub fn message(offset: i64, attributes: i8, key: Option<&[u8]>, value: &[u8]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_i8(0);
    body.put_i8(attributes);
    match key {
        Some(key) => {
            body.put_i32(key.len() as i32);
            body.put_slice(key);
        }
        None => body.put_i32(-1),
    }
    body.put_i32(value.len() as i32);
    body.put_slice(value);

    let mut entry = BytesMut::new();
    entry.put_i64(offset);
    entry.put_i32(body.len() as i32 + 4);
    entry.put_u32(crc32fast::hash(&body));
    entry.put_slice(&body);
    entry.to_vec()
}

/// Plain entries whose values are `value-<offset>`.
pub fn message_set(offsets: &[i64]) -> Vec<u8> {
    offsets
        .iter()
        .flat_map(|&offset| message(offset, 0, None, format!("value-{offset}").as_bytes()))
        .collect()
}

/// A gzip wrapper entry carrying `inner` as its compressed message set.
pub fn gzip_wrapper(offset: i64, inner: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(inner).unwrap();
    message(offset, 1, None, &encoder.finish().unwrap())
}
