use std::sync::Arc;

use apache_avro::types::Value;
use apache_avro::Schema;
use tracing::trace;

use crate::datum::{Datum, GenericRecord};
use crate::error::{Error, Result};
use crate::registry::{CachedSchemaRegistryClient, SchemaRegistry};
use crate::{HEADER_LEN, MAGIC_BYTE};

/// Deserializes payloads framed as `[0x00][schema id: u32 BE][Avro binary]`,
/// resolving the writer schema through the registry.
pub struct KafkaAvroDecoder {
    registry: Arc<dyn SchemaRegistry>,
}

impl KafkaAvroDecoder {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(CachedSchemaRegistryClient::new(url)?)))
    }

    /// Decode one payload. `None` decodes to `None`.
    ///
    /// The magic byte is checked before the registry is consulted. Payloads
    /// written with a `bytes` schema are returned verbatim.
    pub fn decode(&self, data: Option<&[u8]>) -> Result<Option<Datum>> {
        let Some(data) = data else {
            return Ok(None);
        };
        let Some(&magic) = data.first() else {
            return Err(Error::Truncated(0));
        };
        if magic != MAGIC_BYTE {
            return Err(Error::UnknownMagicByte(magic));
        }
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated(data.len()));
        }

        let id = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as i32;
        let schema = self.registry.get_by_id(id)?;
        let mut payload = &data[HEADER_LEN..];
        trace!(id, len = payload.len(), "Decoding record");

        if matches!(schema.as_ref(), Schema::Bytes) {
            return Ok(Some(Datum::Bytes(payload.to_vec())));
        }

        let datum = match apache_avro::from_avro_datum(&schema, &mut payload, None)? {
            Value::Record(fields) => Datum::Record(GenericRecord::from_parts(schema, fields)),
            other => Datum::from(other),
        };
        Ok(Some(datum))
    }
}
