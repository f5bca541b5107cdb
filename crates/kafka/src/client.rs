use std::fmt;
use std::sync::Arc;

use kafka_types::{Message, OffsetMarker};

use crate::bootstrap::Coordinator;
use crate::config::{Backend, FetchConfig};
use crate::connector::RdKafkaClient;
use crate::error::{Error, Result};
use crate::wire::WireClient;

/// Fetch and offset operations shared by every backend.
///
/// A client is owned by one caller at a time; every operation blocks the
/// calling thread and is bounded by the configured socket timeout.
///
/// Nothing is retried internally. When `fetch` fails the client refreshes
/// whatever routing state it keeps and returns the error; the caller decides
/// what to do next:
///
/// - if [`is_offset_out_of_range`](Self::is_offset_out_of_range) says so,
///   resolve a new starting point with
///   [`get_available_offset`](Self::get_available_offset) and fetch again;
/// - otherwise, simply try again later.
pub trait LowLevelClient: Send + fmt::Display {
    /// Discover the brokers and set up backend state. Must be called first.
    fn initialize(&mut self) -> Result<()>;

    /// Fetch the records of one topic-partition starting at `offset`.
    ///
    /// Returned records are in log order and never start below `offset`.
    /// An empty vector means there is nothing new yet.
    fn fetch(&mut self, topic: &str, partition: i32, offset: i64) -> Result<Vec<Message>>;

    /// Whether `err` means the requested offset is outside the retained log.
    fn is_offset_out_of_range(&self, err: &Error) -> bool;

    /// Resolve `marker` to a concrete offset of the partition.
    fn get_available_offset(
        &mut self,
        topic: &str,
        partition: i32,
        marker: OffsetMarker,
    ) -> Result<i64>;

    /// Release connections and backend state. May block until shutdown completes.
    fn close(&mut self) -> Result<()>;
}

/// Build the backend selected by `config.backend`.
///
/// The client is returned uninitialized.
pub fn new_client(
    config: FetchConfig,
    coordinator: Arc<dyn Coordinator>,
) -> Box<dyn LowLevelClient> {
    match config.backend {
        Backend::Wire => Box::new(WireClient::new(config, coordinator)),
        Backend::Rdkafka => Box::new(RdKafkaClient::new(config, coordinator)),
    }
}
