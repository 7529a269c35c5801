//! Thin client for the hosted tabular record store.
//!
//! The store addresses data as `{api_url}/{base_id}/{table_id}` and offers two
//! operations used here: batch creation (`POST` with `{records:[{fields}]}`)
//! and listing with formula filters, sorting and offset pagination (`GET`).
//! Failures are never retried; a non-success status is surfaced with the
//! store's raw body so callers can forward it verbatim.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{RecordStoreConfig, TableIds};

mod query;

pub use query::*;

/// Untyped field map, keyed by the store's column labels
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("missing configuration value {0}")]
    NotConfigured(String),

    #[error("invalid record store URL: {0}")]
    InvalidUrl(String),

    #[error("refusing to send an empty batch")]
    EmptyBatch,

    #[error("record store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected record store payload: {0}")]
    Decode(String),
}

/// Tables this service reads or writes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    EntradaInsumos,
    Insumos,
    EquipoLaboratorio,
}

impl Table {
    /// Configuration key naming this table's identifier
    pub fn config_key(self) -> &'static str {
        match self {
            Table::EntradaInsumos => "record_store.tables.entrada_insumos",
            Table::Insumos => "record_store.tables.insumos",
            Table::EquipoLaboratorio => "record_store.tables.equipo_laboratorio",
        }
    }

    fn id(self, tables: &TableIds) -> Option<&str> {
        match self {
            Table::EntradaInsumos => tables.entrada_insumos.as_deref(),
            Table::Insumos => tables.insumos.as_deref(),
            Table::EquipoLaboratorio => tables.equipo_laboratorio.as_deref(),
        }
        .filter(|id| !id.trim().is_empty())
    }
}

/// A stored record with its store-assigned id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<F = Fields> {
    pub id: String,
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
    pub fields: F,
}

impl Record<Fields> {
    /// Reinterprets the raw field map as a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Record<T>, RecordStoreError> {
        let fields = serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| RecordStoreError::Decode(format!("record {}: {}", self.id, e)))?;
        Ok(Record {
            id: self.id.clone(),
            created_time: self.created_time.clone(),
            fields,
        })
    }
}

/// A record about to be created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord<F> {
    pub fields: F,
}

#[derive(Serialize)]
struct CreateBody<'a, F> {
    records: &'a [NewRecord<F>],
}

/// One page of records, as returned by both list and create calls
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

impl RecordPage {
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// Client handle shared by every request; cheap to clone
#[derive(Clone, Debug)]
pub struct RecordStoreClient {
    http: reqwest::Client,
    config: Arc<RecordStoreConfig>,
}

impl RecordStoreClient {
    pub fn new(config: RecordStoreConfig) -> Result<Self, RecordStoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("datalab-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &RecordStoreConfig {
        &self.config
    }

    /// Resolves credentials and the table id, failing on any missing value
    pub fn table(&self, table: Table) -> Result<TableClient<'_>, RecordStoreError> {
        let base_id = present(self.config.base_id.as_deref())
            .ok_or_else(|| RecordStoreError::NotConfigured("record_store.base_id".into()))?;
        let api_key = present(self.config.api_key.as_deref())
            .ok_or_else(|| RecordStoreError::NotConfigured("record_store.api_key".into()))?;
        let table_id = table
            .id(&self.config.tables)
            .ok_or_else(|| RecordStoreError::NotConfigured(table.config_key().into()))?;

        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| RecordStoreError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RecordStoreError::InvalidUrl(self.config.api_url.clone()))?
            .pop_if_empty()
            .push(base_id)
            .push(table_id);

        Ok(TableClient {
            http: &self.http,
            url,
            api_key,
            table,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Operations against one configured table
#[derive(Debug)]
pub struct TableClient<'a> {
    http: &'a reqwest::Client,
    url: Url,
    api_key: &'a str,
    table: Table,
}

impl TableClient<'_> {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Creates all records in one call; the store decides atomicity
    #[instrument(skip(self, records), fields(table = ?self.table, count = records.len()))]
    pub async fn create_records<F: Serialize>(
        &self,
        records: &[NewRecord<F>],
    ) -> Result<RecordPage, RecordStoreError> {
        if records.is_empty() {
            return Err(RecordStoreError::EmptyBatch);
        }

        let response = self
            .http
            .post(self.url.clone())
            .bearer_auth(self.api_key)
            .json(&CreateBody { records })
            .send()
            .await?;

        let page = read_page(response).await?;
        debug!(created = page.count(), "records created");
        Ok(page)
    }

    /// Fetches a single page
    #[instrument(skip(self, query), fields(table = ?self.table))]
    pub async fn list_records(&self, query: &ListQuery) -> Result<RecordPage, RecordStoreError> {
        let pairs = query.to_query_pairs();
        debug!(params = ?pairs, "listing records");

        let response = self
            .http
            .get(self.url.clone())
            .bearer_auth(self.api_key)
            .query(&pairs)
            .send()
            .await?;

        read_page(response).await
    }

    /// Follows the store's offset cursor until every page has been read
    pub async fn list_all(&self, mut query: ListQuery) -> Result<Vec<Record>, RecordStoreError> {
        let mut records = Vec::new();
        loop {
            let page = self.list_records(&query).await?;
            records.extend(page.records);
            match page.offset {
                Some(offset) => query.offset = Some(offset),
                None => break,
            }
        }
        Ok(records)
    }
}

async fn read_page(response: reqwest::Response) -> Result<RecordPage, RecordStoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "record store rejected request");
        return Err(RecordStoreError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<RecordPage>()
        .await
        .map_err(|e| RecordStoreError::Decode(e.to_string()))
}
