//! Error types for kafka-types crate.

use thiserror::Error;

/// Errors that can occur while parsing shared Kafka types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KafkaTypesError {
    #[error("Invalid offset marker: {0} (expected \"smallest\" or \"largest\")")]
    InvalidOffsetMarker(String),

    #[error("Invalid broker address: {0} (expected host:port)")]
    InvalidBrokerAddress(String),
}

/// Result type alias for kafka-types operations.
pub type Result<T> = std::result::Result<T, KafkaTypesError>;
