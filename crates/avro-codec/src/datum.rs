//! Values handled by the codec.

use std::sync::Arc;

use apache_avro::types::Value;
use apache_avro::Schema;

use crate::error::{Error, Result};

/// A value the encoder accepts or the decoder produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Record(GenericRecord),
    /// Any other Avro value (arrays, maps, unions, enums...)
    Other(Value),
}

impl Datum {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Record(_) => "record",
            Self::Other(_) => "other",
        }
    }
}

/// Non-record values. Records need their schema and go through
/// [`GenericRecord`] instead.
impl From<Value> for Datum {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Boolean(b),
            Value::Int(i) => Self::Int(i),
            Value::Long(l) => Self::Long(l),
            Value::Float(f) => Self::Float(f),
            Value::Double(d) => Self::Double(d),
            Value::String(s) => Self::String(s),
            Value::Bytes(b) => Self::Bytes(b),
            other => Self::Other(other),
        }
    }
}

/// A record value bound to its record schema.
///
/// Fields are kept in schema order, which is the order Avro writes them in.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    schema: Arc<Schema>,
    fields: Vec<(String, Value)>,
}

impl GenericRecord {
    /// Create a record with every field set to null.
    pub fn new(schema: Arc<Schema>) -> Result<Self> {
        let Schema::Record(record) = schema.as_ref() else {
            return Err(Error::NotARecordSchema);
        };
        let fields = record
            .fields
            .iter()
            .map(|field| (field.name.clone(), Value::Null))
            .collect();
        Ok(Self { schema, fields })
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, fields: Vec<(String, Value)>) -> Self {
        Self { schema, fields }
    }

    pub fn put(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(name, _)| name == field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?;
        slot.1 = value.into();
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Unqualified record name, e.g. `User` for `com.example.User`.
    pub fn name(&self) -> &str {
        match self.schema.as_ref() {
            Schema::Record(record) => &record.name.name,
            _ => "",
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub(crate) fn to_value(&self) -> Value {
        Value::Record(self.fields.clone())
    }
}
