//! Schema registry client.
//!
//! [`CachedSchemaRegistryClient`] talks to a Confluent-compatible registry
//! over its REST API. Every registered schema and every schema fetched by id
//! is cached, so steady-state encoding and decoding never hit the network.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use apache_avro::Schema;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maps schemas to registry ids and back.
pub trait SchemaRegistry: Send + Sync {
    /// Register `schema` under `subject` and return its id.
    ///
    /// Registering a schema that already exists returns the existing id.
    fn register(&self, subject: &str, schema: &Schema) -> Result<i32>;

    /// Look up the schema registered with `id`.
    fn get_by_id(&self, id: i32) -> Result<Arc<Schema>>;
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: i32,
}

#[derive(Deserialize)]
struct SchemaResponse {
    schema: String,
}

pub struct CachedSchemaRegistryClient {
    base_url: String,
    http: Client,
    /// (subject, schema JSON) -> id
    ids: RwLock<HashMap<(String, String), i32>>,
    schemas: RwLock<HashMap<i32, Arc<Schema>>>,
}

impl CachedSchemaRegistryClient {
    /// Create a client for the registry at `url`, e.g. `http://localhost:8081`.
    pub fn new(url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            http,
            ids: RwLock::new(HashMap::new()),
            schemas: RwLock::new(HashMap::new()),
        })
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(Error::Registry(format!("{what} failed with status {status}: {body}")))
    }
}

impl SchemaRegistry for CachedSchemaRegistryClient {
    fn register(&self, subject: &str, schema: &Schema) -> Result<i32> {
        let schema_json = serde_json::to_string(schema)?;
        let key = (subject.to_string(), schema_json);

        if let Some(id) = self
            .ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(*id);
        }

        let url = format!("{}/subjects/{subject}/versions", self.base_url);
        debug!("Registering schema under subject {subject} at {url}");
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(&RegisterRequest { schema: &key.1 })
            .send()?;
        let RegisterResponse { id } =
            Self::check(response, &format!("registering subject {subject}"))?.json()?;

        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| Arc::new(schema.clone()));
        self.ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, id);
        Ok(id)
    }

    fn get_by_id(&self, id: i32) -> Result<Arc<Schema>> {
        if let Some(schema) = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(schema));
        }

        let url = format!("{}/schemas/ids/{id}", self.base_url);
        debug!("Fetching schema {id} from {url}");
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, CONTENT_TYPE)
            .send()?;
        let SchemaResponse { schema } =
            Self::check(response, &format!("fetching schema {id}"))?.json()?;
        let schema = Arc::new(Schema::parse_str(&schema)?);

        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&schema));
        Ok(schema)
    }
}
