use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use super::{common::success_response, RecordStoreState};
use crate::{
    errors::ServiceError,
    models::equipo::{fields, responsables_from, Responsable, StaffFields},
    record_store::{ListQuery, Sort, Table},
};

const LIST_FAILED: &str = "Error al obtener responsables";

#[derive(Debug, Serialize)]
pub struct ResponsablesResponse {
    pub success: bool,
    pub responsables: Vec<Responsable>,
}

/// Named laboratory staff, alphabetically
pub async fn list_responsables<S>(State(state): State<S>) -> Result<impl IntoResponse, ServiceError>
where
    S: RecordStoreState,
{
    let store = state.record_store();
    let table = store
        .table(Table::EquipoLaboratorio)
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let query = ListQuery::default()
        .with_field(fields::NOMBRE)
        .with_sort(Sort::asc(fields::NOMBRE));
    let records = table
        .list_all(query)
        .await
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?
        .iter()
        .map(|record| record.decode::<StaffFields>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServiceError::from_store(e, LIST_FAILED))?;

    let excluded = store.config().excluded_responsables();
    Ok(success_response(ResponsablesResponse {
        success: true,
        responsables: responsables_from(records, &excluded),
    }))
}
