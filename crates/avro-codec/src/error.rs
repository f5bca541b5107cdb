use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown magic byte {0:#04x}")]
    UnknownMagicByte(u8),

    #[error("Message too short: {0} bytes, expected at least 5")]
    Truncated(usize),

    #[error("Only records can be encoded, got {0}")]
    NotARecord(&'static str),

    #[error("Schema is not a record schema")]
    NotARecordSchema,

    #[error("Record has no field named {0}")]
    UnknownField(String),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("Schema registry error: {0}")]
    Registry(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
