//! Stock entry endpoints: receive shipments and list entries by expiry.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{
    common::{json_body, success_response},
    RecordStoreState,
};
use crate::{
    auth::SessionClaims,
    errors::ServiceError,
    models::entrada::{created_message, validate_entries, CreateEntriesRequest},
    record_store::{EntryFilter, ListQuery, Record, RecordPage, Table},
};

pub const DEFAULT_MAX_RECORDS: u32 = 100;

const CREATE_FAILED: &str = "Error al crear registros en Airtable";
const LIST_FAILED: &str = "Error al obtener registros de Airtable";

#[derive(Debug, Serialize)]
pub struct CreateEntriesResponse {
    pub success: bool,
    pub message: String,
    /// The store's answer, created records with their ids
    pub data: RecordPage,
    pub proveedor: Option<Value>,
    #[serde(rename = "numeroFactura")]
    pub numero_factura: Option<Value>,
    pub observaciones: Option<Value>,
}

/// Create stock entries in one batch
pub async fn create_entries<S>(
    State(state): State<S>,
    session: Option<Extension<SessionClaims>>,
    payload: Result<Json<CreateEntriesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: RecordStoreState,
{
    let table = state
        .record_store()
        .table(Table::EntradaInsumos)
        .map_err(|e| ServiceError::from_store(e, CREATE_FAILED))?;

    let body = json_body(payload)?;
    let registrant = session.as_ref().map(|Extension(claims)| claims.nombre.as_str());

    let records: Vec<_> = validate_entries(body.records.as_ref())
        .map_err(|e| ServiceError::validation(e.to_string()))?
        .into_iter()
        .map(|mut record| {
            record.fields = record.fields.registered_by(registrant);
            record
        })
        .collect();

    let total_units: f64 = records.iter().map(|record| record.fields.cantidad()).sum();
    let page = table
        .create_records(&records)
        .await
        .map_err(|e| ServiceError::from_store(e, CREATE_FAILED))?;

    info!(
        created = page.count(),
        total_units,
        registrant = ?registrant,
        "stock entries created"
    );

    Ok(success_response(CreateEntriesResponse {
        success: true,
        message: created_message(page.count()),
        data: page,
        proveedor: body.proveedor,
        numero_factura: body.numero_factura,
        observaciones: body.observaciones,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryListParams {
    /// Blank means the default cap
    #[serde(rename = "maxRecords")]
    pub max_records: Option<String>,
    #[serde(rename = "insumoId")]
    pub insumo_id: Option<String>,
    /// Only the literal `true` enables the filter
    pub disponibles: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryFilters {
    #[serde(rename = "insumoId")]
    pub insumo_id: Option<String>,
    #[serde(rename = "soloDisponibles")]
    pub solo_disponibles: bool,
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub success: bool,
    pub entradas: Vec<Record>,
    pub count: usize,
    pub filtros: EntryFilters,
}

/// List stock entries, earliest expiry first
pub async fn list_entries<S>(
    State(state): State<S>,
    params: Result<Query<EntryListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: RecordStoreState,
{
    let table = state
        .record_store()
        .table(Table::EntradaInsumos)
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let Query(params) = params?;
    let max_records = parse_max_records(params.max_records.as_deref())?;

    let filter = EntryFilter::new(
        params.insumo_id,
        params.disponibles.as_deref() == Some("true"),
    );
    let page = table
        .list_records(&ListQuery::for_entries(&filter, max_records))
        .await
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let count = page.count();
    Ok(success_response(EntryListResponse {
        success: true,
        entradas: page.records,
        count,
        filtros: EntryFilters {
            insumo_id: filter.insumo_id,
            solo_disponibles: filter.solo_disponibles,
        },
    }))
}

fn parse_max_records(raw: Option<&str>) -> Result<u32, ServiceError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_MAX_RECORDS),
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|max| *max > 0)
            .ok_or_else(|| ServiceError::validation("maxRecords debe ser un entero mayor a 0")),
    }
}
