use kafka_dataplane::{Error, KafkaCode, LowLevelClient, Message};

use crate::connect;
use crate::mock_broker::{gzip_wrapper, message, message_set, MockBroker, Partition};

fn offsets(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.offset).collect()
}

#[test]
fn test_fetch_drops_entries_before_requested_offset() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            messages: message_set(&[5, 6, 7, 8]),
            latest: 9,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    let messages = client.fetch("events", 0, 7).unwrap();

    assert_eq!(offsets(&messages), vec![7, 8]);
    assert_eq!(messages[0].value, b"value-7");
    assert_eq!(messages[0].topic, "events");
    assert_eq!(messages[0].partition, 0);
    assert_eq!(
        broker.state().fetches,
        vec![("events".to_string(), 0, 7)]
    );
}

#[test]
fn test_fetch_unwraps_compressed_batch() {
    let broker = MockBroker::start();
    let mut raw = gzip_wrapper(12, &message_set(&[10, 11, 12]));
    raw.extend(message(13, 0, Some(b"k"), b"plain"));
    broker.add_partition(
        "events",
        1,
        Partition {
            messages: raw,
            latest: 14,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    let messages = client.fetch("events", 1, 10).unwrap();

    assert_eq!(offsets(&messages), vec![10, 11, 12, 13]);
    assert_eq!(messages[2].value, b"value-12");
    assert_eq!(messages[3].key.as_deref(), Some(&b"k"[..]));
}

#[test]
fn test_fetch_from_inside_compressed_batch() {
    let broker = MockBroker::start();
    let mut raw = gzip_wrapper(12, &message_set(&[10, 11, 12]));
    raw.extend(message(13, 0, None, b"plain"));
    broker.add_partition(
        "events",
        0,
        Partition {
            messages: raw,
            latest: 14,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    let messages = client.fetch("events", 0, 11).unwrap();

    assert_eq!(offsets(&messages), vec![11, 12, 13]);
    assert_eq!(messages[0].value, b"value-11");
}

#[test]
fn test_fetch_empty_partition() {
    let broker = MockBroker::start();
    broker.add_partition("events", 0, Partition::default());

    let mut client = connect(&broker);
    assert!(client.fetch("events", 0, 0).unwrap().is_empty());
}

#[test]
fn test_broker_error_refreshes_metadata() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            error: 1,
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    assert_eq!(broker.state().metadata_requests, 1);

    let err = client.fetch("events", 0, 1_000).unwrap_err();
    assert!(matches!(err, Error::Broker(KafkaCode::OffsetOutOfRange)));
    assert!(client.is_offset_out_of_range(&err));
    assert_eq!(broker.state().metadata_requests, 2);
}

#[test]
fn test_unknown_topic_has_no_leader() {
    let broker = MockBroker::start();
    broker.add_partition("events", 0, Partition::default());

    let mut client = connect(&broker);
    let err = client.fetch("missing", 0, 0).unwrap_err();

    assert!(matches!(
        err,
        Error::LeaderNotAvailable { ref topic, partition: 0 } if topic == "missing"
    ));
    assert!(!client.is_offset_out_of_range(&err));
    assert!(broker.state().fetches.is_empty());
}

#[test]
fn test_connections_are_reused() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            messages: message_set(&[0, 1]),
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    for _ in 0..3 {
        assert_eq!(client.fetch("events", 0, 0).unwrap().len(), 2);
    }

    let state = broker.state();
    assert_eq!(state.connections, 1);
    assert!(state.client_ids.iter().all(|id| id == "wire-test"));
}

#[test]
fn test_transport_failure_abandons_pool() {
    let broker = MockBroker::start();
    broker.add_partition(
        "events",
        0,
        Partition {
            messages: message_set(&[3]),
            ..Default::default()
        },
    );

    let mut client = connect(&broker);
    broker.state().drop_next_fetch = true;

    let err = client.fetch("events", 0, 3).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");

    // The failed socket's pool is gone; the metadata refresh and the retry
    // share one fresh connection.
    let messages = client.fetch("events", 0, 3).unwrap();
    assert_eq!(offsets(&messages), vec![3]);
    assert_eq!(broker.state().connections, 2);
}

#[test]
fn test_close_resets_client() {
    let broker = MockBroker::start();
    broker.add_partition("events", 0, Partition::default());

    let mut client = connect(&broker);
    client.close().unwrap();

    assert!(matches!(
        client.fetch("events", 0, 0),
        Err(Error::NotInitialized)
    ));

    client.initialize().unwrap();
    assert!(client.fetch("events", 0, 0).unwrap().is_empty());
}
