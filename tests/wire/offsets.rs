use std::sync::Arc;

use kafka_dataplane::{
    connect as connect_client, Backend, Error, FetchConfig, KafkaCode, LowLevelClient,
    OffsetMarker, StaticCoordinator,
};

use crate::connect;
use crate::mock_broker::{MockBroker, Partition};

#[test]
fn test_earliest_and_latest_offsets() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        2,
        Partition {
            earliest: 100,
            latest: 250,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    assert_eq!(
        client
            .get_available_offset("events", 2, OffsetMarker::Smallest)
            .unwrap(),
        100
    );
    assert_eq!(
        client
            .get_available_offset("events", 2, OffsetMarker::Largest)
            .unwrap(),
        250
    );
}

#[test]
fn test_out_of_range_recovery() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            error: KafkaCode::OffsetOutOfRange.as_i16(),
            earliest: 40,
            latest: 90,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    let err = client.fetch("events", 0, 5).unwrap_err();
    assert!(client.is_offset_out_of_range(&err));

    let marker: OffsetMarker = "smallest".parse().unwrap();
    assert_eq!(
        client.get_available_offset("events", 0, marker).unwrap(),
        40
    );
}

#[test]
fn test_facade_connect_initializes_selected_backend() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            latest: 7,
            ..Default::default()
        },
    );

    let config = FetchConfig {
        backend: Backend::Wire,
        socket_timeout_ms: 5_000,
        ..Default::default()
    };
    let coordinator = Arc::new(StaticCoordinator::new(vec![broker.info()]));
    let mut client = connect_client(config, coordinator).unwrap();

    assert_eq!(client.to_string(), "wire client");
    assert_eq!(
        client
            .get_available_offset("events", 0, OffsetMarker::Largest)
            .unwrap(),
        7
    );
    client.close().unwrap();
}

#[test]
fn test_facade_connect_reports_backend_on_failure() {
    let coordinator = Arc::new(StaticCoordinator::default());
    let err = connect_client(FetchConfig::default(), coordinator).err().expect("connect_client should fail");

    assert!(err.to_string().contains("wire client"));
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::Coordinator(_))
    ));
}
