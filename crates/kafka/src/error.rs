use thiserror::Error;

use crate::wire::KafkaCode;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Broker error: {0}")]
    Broker(KafkaCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unsupported compression codec: {0}")]
    UnsupportedCompression(i8),

    #[error("No leader available for {topic}:{partition}")]
    LeaderNotAvailable { topic: String, partition: i32 },

    #[error("Coordinator error: {0}")]
    Coordinator(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Client is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Types(#[from] kafka_types::KafkaTypesError),
}

pub type Result<T> = std::result::Result<T, Error>;
