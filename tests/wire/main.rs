//! Wire backend tests
//!
//! Runs the wire client against an in-process mock broker, covering the
//! full fetch path: metadata routing, pooled connections, offset correction,
//! compressed-batch unwrapping and error classification.

mod fetch;
mod mock_broker;
mod offsets;

use std::sync::Arc;

use kafka_dataplane::{FetchConfig, LowLevelClient, StaticCoordinator, WireClient};
use mock_broker::MockBroker;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("kafka_lowlevel=trace,connection_pool=trace")
        .with_test_writer()
        .try_init()
        .ok();
}

/// An initialized wire client bootstrapped from the mock broker.
fn connect(broker: &MockBroker) -> WireClient {
    init_logging();

    let config = FetchConfig {
        client_id: "wire-test".to_string(),
        socket_timeout_ms: 5_000,
        connection_pool_size: 2,
        ..Default::default()
    };
    let coordinator = Arc::new(StaticCoordinator::new(vec![broker.info()]));
    let mut client = WireClient::new(config, coordinator);
    client.initialize().unwrap();
    client
}
