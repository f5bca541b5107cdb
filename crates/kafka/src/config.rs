//! Fetch client configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{Error, Result};
use crate::wire::protocol::MAX_STRING_LEN;

/// Which protocol library a [`LowLevelClient`](crate::LowLevelClient) is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// Speaks the Kafka binary protocol directly over pooled sockets
    #[default]
    Wire,
    /// Delegates to librdkafka through the `rdkafka` crate
    Rdkafka,
}

/// Configuration consumed by the fetch client at initialization.
#[derive(Debug, Clone, Parser)]
pub struct FetchConfig {
    /// Client identifier sent to the brokers with every request
    #[clap(long, env = "KAFKA_CLIENT_ID", default_value = "kafka-dataplane")]
    pub client_id: String,

    /// Minimum number of bytes the broker should accumulate before answering a fetch
    #[clap(long, env = "KAFKA_FETCH_MIN_BYTES", default_value_t = 1)]
    pub fetch_min_bytes: i32,

    /// Maximum time in milliseconds the broker may block a fetch waiting for `fetch_min_bytes`
    #[clap(long, env = "KAFKA_FETCH_WAIT_MAX_MS", default_value_t = 100)]
    pub fetch_wait_max_ms: i32,

    /// Maximum number of bytes fetched per partition per request
    #[clap(long, env = "KAFKA_FETCH_MESSAGE_MAX_BYTES", default_value_t = 1024 * 1024)]
    pub fetch_message_max_bytes: i32,

    /// Socket read/write/connect timeout in milliseconds.
    ///
    /// This is the only timeout boundary of a fetch; it must be larger than
    /// `fetch_wait_max_ms`, otherwise a long-polling fetch would time out
    /// on the client before the broker answers.
    #[clap(long, env = "KAFKA_SOCKET_TIMEOUT_MS", default_value_t = 30_000)]
    pub socket_timeout_ms: u64,

    /// Protocol backend to use
    #[clap(long, env = "KAFKA_BACKEND", value_enum, default_value_t = Backend::Wire)]
    pub backend: Backend,

    /// Maximum number of pooled connections per broker (wire backend)
    #[clap(long, env = "KAFKA_CONNECTION_POOL_SIZE", default_value_t = 4)]
    pub connection_pool_size: usize,

    /// Enable TCP keep-alive on pooled connections (wire backend)
    #[clap(long, env = "KAFKA_KEEP_ALIVE", default_value_t = true, action = clap::ArgAction::Set)]
    pub keep_alive: bool,

    /// TCP keep-alive idle period in milliseconds (wire backend)
    #[clap(long, env = "KAFKA_KEEP_ALIVE_PERIOD_MS", default_value_t = 60_000)]
    pub keep_alive_period_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            client_id: "kafka-dataplane".to_string(),
            fetch_min_bytes: 1,
            fetch_wait_max_ms: 100,
            fetch_message_max_bytes: 1024 * 1024,
            socket_timeout_ms: 30_000,
            backend: Backend::Wire,
            connection_pool_size: 4,
            keep_alive: true,
            keep_alive_period_ms: 60_000,
        }
    }
}

impl FetchConfig {
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn fetch_wait_max(&self) -> Duration {
        Duration::from_millis(self.fetch_wait_max_ms.max(0) as u64)
    }

    /// Keep-alive period, or `None` when keep-alive is disabled.
    pub fn keep_alive_period(&self) -> Option<Duration> {
        self.keep_alive
            .then(|| Duration::from_millis(self.keep_alive_period_ms))
    }

    /// Check the settings both backends rely on.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::InvalidConfig("client_id must not be empty".into()));
        }
        if self.client_id.len() > MAX_STRING_LEN {
            return Err(Error::InvalidConfig(format!(
                "client_id must be at most {MAX_STRING_LEN} bytes, got {}",
                self.client_id.len()
            )));
        }
        if self.fetch_min_bytes < 0 {
            return Err(Error::InvalidConfig(format!(
                "fetch_min_bytes must not be negative, got {}",
                self.fetch_min_bytes
            )));
        }
        if self.fetch_message_max_bytes <= 0 {
            return Err(Error::InvalidConfig(format!(
                "fetch_message_max_bytes must be positive, got {}",
                self.fetch_message_max_bytes
            )));
        }
        if self.socket_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "socket_timeout_ms must be positive".into(),
            ));
        }
        if self.fetch_wait_max_ms < 0 || self.fetch_wait_max_ms as u64 >= self.socket_timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "fetch_wait_max_ms ({}) must be between 0 and socket_timeout_ms ({})",
                self.fetch_wait_max_ms, self.socket_timeout_ms
            )));
        }
        if self.connection_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "connection_pool_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
