//! Supply item endpoints: stock overview and item creation.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    common::{created_response, json_body, success_response, validate_input},
    RecordStoreState,
};
use crate::{
    errors::ServiceError,
    models::insumo::{
        fields, CategoryFilter, NewSupplyItemFields, NewSupplyItemRequest, StockState,
        StockSummary, SupplyItemFields,
    },
    record_store::{ListQuery, NewRecord, Record, RecordStoreError, Sort, Table},
};

const LIST_FAILED: &str = "Error al obtener insumos de Airtable";
const CREATE_FAILED: &str = "Error al crear el insumo en Airtable";

#[derive(Debug, Default, Deserialize)]
pub struct StockListParams {
    /// A category label, `todos` for the basic set or `ver-todas`
    pub categoria: Option<String>,
}

/// A supply item with its derived stock state
#[derive(Debug, Serialize)]
pub struct SupplyItemView {
    pub id: String,
    #[serde(rename = "createdTime", skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    pub fields: SupplyItemFields,
    #[serde(rename = "stockState")]
    pub stock_state: StockState,
}

impl From<Record<SupplyItemFields>> for SupplyItemView {
    fn from(record: Record<SupplyItemFields>) -> Self {
        let stock_state = record.fields.stock_state();
        Self {
            id: record.id,
            created_time: record.created_time,
            fields: record.fields,
            stock_state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockListResponse {
    pub success: bool,
    pub insumos: Vec<SupplyItemView>,
    pub summary: StockSummary,
}

pub async fn list_stock<S>(
    State(state): State<S>,
    params: Result<Query<StockListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: RecordStoreState,
{
    let table = state
        .record_store()
        .table(Table::Insumos)
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let Query(params) = params?;
    let filter = CategoryFilter::parse(params.categoria.as_deref()).map_err(ServiceError::validation)?;

    let query = ListQuery::default()
        .with_formula(filter.formula())
        .with_sort(Sort::asc(fields::NOMBRE));
    let insumos = table
        .list_all(query)
        .await
        .and_then(|records| {
            records
                .iter()
                .map(|record| record.decode::<SupplyItemFields>().map(SupplyItemView::from))
                .collect::<Result<Vec<_>, RecordStoreError>>()
        })
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let summary = StockSummary::tally(insumos.iter().map(|item| item.stock_state));
    Ok(success_response(StockListResponse {
        success: true,
        insumos,
        summary,
    }))
}

#[derive(Debug, Serialize)]
pub struct CreateSupplyItemResponse {
    pub success: bool,
    pub message: &'static str,
    pub insumo: Record,
}

pub async fn create_supply_item<S>(
    State(state): State<S>,
    payload: Result<Json<NewSupplyItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError>
where
    S: RecordStoreState,
{
    let table = state
        .record_store()
        .table(Table::Insumos)
        .map_err(|e| ServiceError::from_store(e, CREATE_FAILED))?;

    let request = json_body(payload)?;
    validate_input(&request)?;

    let record = NewRecord {
        fields: NewSupplyItemFields::from(request),
    };
    let page = table
        .create_records(std::slice::from_ref(&record))
        .await
        .map_err(|e| ServiceError::from_store(e, CREATE_FAILED))?;

    let insumo = page.records.into_iter().next().ok_or_else(|| {
        ServiceError::Internal("el almacén no devolvió el insumo creado".to_string())
    })?;
    info!(id = %insumo.id, nombre = %record.fields.nombre, "supply item created");

    Ok(created_response(CreateSupplyItemResponse {
        success: true,
        message: "Insumo creado exitosamente",
        insumo,
    }))
}
