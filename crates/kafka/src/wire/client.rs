use std::collections::HashMap;
use std::fmt;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use connection_pool::ConnectionPool;
use kafka_types::{Message, OffsetMarker};
use tracing::{debug, info, trace, warn};

use crate::bootstrap::{bootstrap_brokers, Coordinator};
use crate::client::LowLevelClient;
use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::wire::message_set::{collect_messages, filter_partition_data, MessageSet};
use crate::wire::protocol::{
    encode_request, fetch_request, metadata_request, offsets_request, read_response,
    send_request, FetchResponse, KafkaCode, MetadataResponse, OffsetsResponse, API_KEY_FETCH,
    API_KEY_METADATA, API_KEY_OFFSETS, EARLIEST_TIME, LATEST_TIME,
};

/// Fetch client speaking the Kafka binary protocol over pooled sockets.
///
/// Routing state (brokers and partition leaders) is cached from Metadata
/// responses and refreshed whenever a request fails. Each broker address gets
/// its own [`ConnectionPool`]; a pool whose connection failed mid-request is
/// dropped so the next request to that broker dials fresh sockets.
pub struct WireClient {
    config: FetchConfig,
    coordinator: Arc<dyn Coordinator>,
    bootstrap: Vec<String>,
    /// node id -> `host:port`
    brokers: HashMap<i32, String>,
    /// (topic, partition) -> leader node id
    leaders: HashMap<(String, i32), i32>,
    pools: HashMap<String, Arc<ConnectionPool>>,
    correlation_id: i32,
    initialized: bool,
}

impl WireClient {
    pub fn new(config: FetchConfig, coordinator: Arc<dyn Coordinator>) -> Self {
        Self {
            config,
            coordinator,
            bootstrap: Vec::new(),
            brokers: HashMap::new(),
            leaders: HashMap::new(),
            pools: HashMap::new(),
            correlation_id: 0,
            initialized: false,
        }
    }

    /// Address of the current leader for a topic-partition, loading topic
    /// metadata on a cache miss.
    fn leader_for(&mut self, topic: &str, partition: i32) -> Result<String> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let key = (topic.to_string(), partition);
        if !self.leaders.contains_key(&key) {
            self.load_metadata(&[topic])?;
        }

        self.leaders
            .get(&key)
            .and_then(|node| self.brokers.get(node))
            .cloned()
            .ok_or_else(|| Error::LeaderNotAvailable {
                topic: topic.to_string(),
                partition,
            })
    }

    /// Forget the cached routing for `topic` and reload it.
    ///
    /// Called after every failed request. A failed reload is only logged; the
    /// next request will try again on its cache miss.
    fn refresh_metadata(&mut self, topic: &str) {
        self.leaders.retain(|(t, _), _| t != topic);
        if let Err(e) = self.load_metadata(&[topic]) {
            warn!("Failed to refresh metadata for topic {topic}: {e}");
        }
    }

    /// Ask any reachable broker for metadata; an empty topic list loads every topic.
    fn load_metadata(&mut self, topics: &[&str]) -> Result<()> {
        let mut candidates: Vec<String> = self.brokers.values().cloned().collect();
        for address in &self.bootstrap {
            if !candidates.contains(address) {
                candidates.push(address.clone());
            }
        }

        let body = metadata_request(topics)?;
        let mut last_error = None;
        for address in candidates {
            let response = self
                .send_receive(&address, API_KEY_METADATA, &body)
                .and_then(MetadataResponse::decode);
            match response {
                Ok(metadata) => {
                    self.apply_metadata(metadata);
                    return Ok(());
                }
                Err(e) => {
                    debug!("Metadata request to {address} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Coordinator("no brokers available for metadata request".to_string())
        }))
    }

    fn apply_metadata(&mut self, metadata: MetadataResponse) {
        for broker in &metadata.brokers {
            self.brokers.insert(broker.node_id, broker.address());
        }

        for topic in metadata.topics {
            if let Some(code) = topic.error {
                debug!("Metadata for topic {} reports {code}", topic.name);
            }
            for partition in topic.partitions {
                let key = (topic.name.clone(), partition.id);
                if partition.error.is_none() && partition.leader >= 0 {
                    self.leaders.insert(key, partition.leader);
                } else {
                    self.leaders.remove(&key);
                }
            }
        }

        debug!(
            brokers = self.brokers.len(),
            partitions = self.leaders.len(),
            "Loaded cluster metadata"
        );
    }

    fn pool(&mut self, address: &str) -> Arc<ConnectionPool> {
        let config = &self.config;
        self.pools
            .entry(address.to_string())
            .or_insert_with(|| {
                let mut pool = ConnectionPool::new(address, config.connection_pool_size)
                    .with_connect_timeout(config.socket_timeout());
                if let Some(period) = config.keep_alive_period() {
                    pool = pool.with_keep_alive(period);
                }
                Arc::new(pool)
            })
            .clone()
    }

    fn next_correlation_id(&mut self) -> i32 {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        self.correlation_id
    }

    /// One request/response round trip on a pooled connection.
    fn send_receive(&mut self, address: &str, api_key: i16, body: &[u8]) -> Result<Bytes> {
        let correlation_id = self.next_correlation_id();
        let request = encode_request(api_key, correlation_id, &self.config.client_id, body)?;
        let pool = self.pool(address);

        match exchange(&pool, &request, correlation_id, self.config.socket_timeout()) {
            Ok((conn, response)) => {
                pool.release(conn);
                Ok(response)
            }
            Err(e) => {
                warn!("Abandoning connection pool for {address} after transport failure: {e}");
                self.pools.remove(address);
                Err(e)
            }
        }
    }
}

fn exchange(
    pool: &ConnectionPool,
    request: &[u8],
    correlation_id: i32,
    timeout: Duration,
) -> Result<(TcpStream, Bytes)> {
    let mut conn = pool.borrow()?;
    conn.set_read_timeout(Some(timeout))?;
    conn.set_write_timeout(Some(timeout))?;
    send_request(&mut conn, request)?;
    let response = read_response(&mut conn, correlation_id)?;
    Ok((conn, response))
}

impl LowLevelClient for WireClient {
    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        self.bootstrap = bootstrap_brokers(self.coordinator.as_ref())?;
        self.initialized = true;

        if let Err(e) = self.load_metadata(&[]) {
            self.initialized = false;
            return Err(e);
        }

        info!(
            "Initialized {self} with bootstrap brokers {}",
            self.bootstrap.join(",")
        );
        Ok(())
    }

    fn fetch(&mut self, topic: &str, partition: i32, offset: i64) -> Result<Vec<Message>> {
        trace!(topic, partition, offset, "Fetching");

        let leader = match self.leader_for(topic, partition) {
            Ok(leader) => leader,
            Err(e) => {
                if !matches!(e, Error::NotInitialized) {
                    self.refresh_metadata(topic);
                }
                return Err(e);
            }
        };

        let body = fetch_request(
            topic,
            partition,
            offset,
            self.config.fetch_wait_max_ms,
            self.config.fetch_min_bytes,
            self.config.fetch_message_max_bytes,
        )?;
        let response = match self
            .send_receive(&leader, API_KEY_FETCH, &body)
            .and_then(FetchResponse::decode)
        {
            Ok(response) => response,
            Err(e) => {
                self.refresh_metadata(topic);
                return Err(e);
            }
        };

        let Some(block) = response.partition(topic, partition) else {
            debug!("Empty fetch response for {topic}:{partition}");
            return Ok(Vec::new());
        };

        if let Some(code) = block.error {
            self.refresh_metadata(topic);
            return Err(Error::Broker(code));
        }

        if block.message_set.is_empty() {
            debug!("No new messages in {topic}:{partition} at offset {offset}");
            return Ok(Vec::new());
        }

        let max_inflated = self.config.fetch_message_max_bytes as usize;
        let mut set = MessageSet::decode(block.message_set.clone(), max_inflated)?;
        filter_partition_data(&mut set, offset);
        Ok(collect_messages(set, topic, partition))
    }

    fn is_offset_out_of_range(&self, err: &Error) -> bool {
        matches!(err, Error::Broker(KafkaCode::OffsetOutOfRange))
    }

    fn get_available_offset(
        &mut self,
        topic: &str,
        partition: i32,
        marker: OffsetMarker,
    ) -> Result<i64> {
        let time = match marker {
            OffsetMarker::Smallest => EARLIEST_TIME,
            OffsetMarker::Largest => LATEST_TIME,
        };

        let leader = match self.leader_for(topic, partition) {
            Ok(leader) => leader,
            Err(e) => {
                if !matches!(e, Error::NotInitialized) {
                    self.refresh_metadata(topic);
                }
                return Err(e);
            }
        };

        let body = offsets_request(topic, partition, time)?;
        let response = match self
            .send_receive(&leader, API_KEY_OFFSETS, &body)
            .and_then(OffsetsResponse::decode)
        {
            Ok(response) => response,
            Err(e) => {
                self.refresh_metadata(topic);
                return Err(e);
            }
        };

        let block = response.partition(topic, partition).ok_or_else(|| {
            Error::Protocol(format!("offsets response is missing {topic}:{partition}"))
        })?;
        if let Some(code) = block.error {
            self.refresh_metadata(topic);
            return Err(Error::Broker(code));
        }

        let offset = block.offsets.first().copied().ok_or_else(|| {
            Error::Protocol(format!("no {marker} offset returned for {topic}:{partition}"))
        })?;
        debug!("{marker} offset for {topic}:{partition} is {offset}");
        Ok(offset)
    }

    fn close(&mut self) -> Result<()> {
        self.pools.clear();
        self.leaders.clear();
        self.brokers.clear();
        self.initialized = false;
        info!("Closed {self}");
        Ok(())
    }
}

impl fmt::Display for WireClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("wire client")
    }
}
