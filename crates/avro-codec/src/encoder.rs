use std::collections::HashMap;
use std::sync::Arc;

use apache_avro::Schema;
use tracing::trace;

use crate::datum::Datum;
use crate::error::{Error, Result};
use crate::registry::{CachedSchemaRegistryClient, SchemaRegistry};
use crate::{HEADER_LEN, MAGIC_BYTE};

/// Serializes records into the registry wire envelope
/// `[0x00][schema id: u32 BE][Avro binary]`.
///
/// Each record's schema is registered under the subject `<record name>-value`
/// once the record has been serialized against it.
pub struct KafkaAvroEncoder {
    registry: Arc<dyn SchemaRegistry>,
    primitives: HashMap<&'static str, Arc<Schema>>,
}

impl KafkaAvroEncoder {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        let primitives = [
            ("null", Schema::Null),
            ("boolean", Schema::Boolean),
            ("int", Schema::Int),
            ("long", Schema::Long),
            ("float", Schema::Float),
            ("double", Schema::Double),
            ("string", Schema::String),
            ("bytes", Schema::Bytes),
        ]
        .into_iter()
        .map(|(name, schema)| (name, Arc::new(schema)))
        .collect();

        Self {
            registry,
            primitives,
        }
    }

    /// Encoder backed by a [`CachedSchemaRegistryClient`] for `url`.
    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(CachedSchemaRegistryClient::new(url)?)))
    }

    /// Encode a record. `None` encodes to `None`.
    pub fn encode(&self, datum: Option<&Datum>) -> Result<Option<Vec<u8>>> {
        let Some(datum) = datum else {
            return Ok(None);
        };
        let Datum::Record(record) = datum else {
            return Err(Error::NotARecord(datum.type_name()));
        };

        let schema = self.schema_for(datum);
        // Invalid field values fail here, before anything reaches the registry
        let payload = apache_avro::to_avro_datum(&schema, record.to_value())?;
        let subject = format!("{}-value", record.name());
        let id = self.registry.register(&subject, &schema)?;

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.push(MAGIC_BYTE);
        out.extend_from_slice(&(id as u32).to_be_bytes());
        out.extend_from_slice(&payload);

        trace!(subject, id, len = out.len(), "Encoded record");
        Ok(Some(out))
    }

    /// The Avro schema describing `datum`.
    ///
    /// Primitive kinds share the schemas built at construction; records carry
    /// their own.
    ///
    /// # Panics
    ///
    /// Panics for [`Datum::Other`]: only null, boolean, int, long, float,
    /// double, string, bytes and records are supported.
    pub fn schema_for(&self, datum: &Datum) -> Arc<Schema> {
        match datum {
            Datum::Record(record) => Arc::clone(record.schema()),
            Datum::Other(value) => panic!(
                "Unsupported Avro type {value:?}. Supported types are null, boolean, int, long, \
                 float, double, string, bytes and records"
            ),
            primitive => Arc::clone(&self.primitives[primitive.type_name()]),
        }
    }
}
