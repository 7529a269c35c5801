//! Stock entries (Entrada Insumos): receipts that increase a supply item's stock.
//!
//! Incoming batches arrive as loosely shaped JSON; [`validate_entries`] turns
//! them into [`StockEntryFields`] or rejects the whole batch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

use crate::record_store::{Fields, NewRecord};

/// Column labels of the entries table
pub mod fields {
    pub const INSUMOS_LABORATORIO: &str = "Insumos Laboratorio";
    pub const CANTIDAD_INGRESA_UNIDADES: &str = "Cantidad Ingresa Unidades";
    pub const REALIZA_REGISTRO: &str = "Realiza Registro";
    pub const FECHA_VENCIMIENTO: &str = "fecha_vencimiento";
    pub const TOTAL_GRANEL_ACTUAL: &str = "Total Cantidad Granel Actual";
}

/// Body of the create-entries endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEntriesRequest {
    #[serde(default)]
    pub records: Option<Value>,
    #[serde(default)]
    pub proveedor: Option<Value>,
    #[serde(default, rename = "numeroFactura")]
    pub numero_factura: Option<Value>,
    #[serde(default)]
    pub observaciones: Option<Value>,
}

/// Validated fields of one stock entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntryFields {
    /// Linked supply item ids; never empty
    #[serde(rename = "Insumos Laboratorio")]
    pub insumos: Vec<String>,

    /// Units received; strictly positive. Kept as the caller's JSON number.
    #[serde(rename = "Cantidad Ingresa Unidades")]
    pub cantidad_ingresa_unidades: Number,

    #[serde(
        rename = "Realiza Registro",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub realiza_registro: Option<String>,

    #[serde(
        rename = "fecha_vencimiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fecha_vencimiento: Option<NaiveDate>,

    /// Remaining columns, forwarded untouched
    #[serde(flatten)]
    pub extra: Fields,
}

impl StockEntryFields {
    pub fn cantidad(&self) -> f64 {
        self.cantidad_ingresa_unidades.as_f64().unwrap_or_default()
    }

    /// Records `name` as the registrant unless the caller already named one
    pub fn registered_by(mut self, name: Option<&str>) -> Self {
        if self.realiza_registro.is_none() {
            self.realiza_registro = name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryValidationError {
    #[error("Se requiere al menos un registro de entrada")]
    EmptyBatch,

    #[error("Cada registro debe tener un objeto fields")]
    MissingFields,

    #[error("Cada registro debe tener al menos un insumo en Insumos Laboratorio")]
    MissingSupplyReference,

    #[error("Cada registro debe tener una Cantidad Ingresa Unidades válida (número mayor a 0)")]
    InvalidQuantity,

    #[error("fecha_vencimiento debe ser una fecha válida (AAAA-MM-DD): {0}")]
    InvalidExpiryDate(String),

    #[error("Realiza Registro debe ser texto")]
    InvalidRegistrant,
}

/// Checks every record before anything is sent; one bad record rejects the batch.
pub fn validate_entries(
    records: Option<&Value>,
) -> Result<Vec<NewRecord<StockEntryFields>>, EntryValidationError> {
    let records = match records.and_then(Value::as_array) {
        Some(records) if !records.is_empty() => records,
        _ => return Err(EntryValidationError::EmptyBatch),
    };

    records
        .iter()
        .map(|record| parse_entry(record).map(|fields| NewRecord { fields }))
        .collect()
}

fn parse_entry(record: &Value) -> Result<StockEntryFields, EntryValidationError> {
    let mut fields = record
        .get("fields")
        .and_then(Value::as_object)
        .cloned()
        .ok_or(EntryValidationError::MissingFields)?;

    let insumos = match fields.remove(fields::INSUMOS_LABORATORIO) {
        Some(Value::Array(items)) if !items.is_empty() => items
            .into_iter()
            .map(|item| match item {
                Value::String(id) if !id.trim().is_empty() => Ok(id),
                _ => Err(EntryValidationError::MissingSupplyReference),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(EntryValidationError::MissingSupplyReference),
    };

    let cantidad_ingresa_unidades = match fields.remove(fields::CANTIDAD_INGRESA_UNIDADES) {
        Some(Value::Number(n)) if n.as_f64().map_or(false, |q| q > 0.0) => n,
        _ => return Err(EntryValidationError::InvalidQuantity),
    };

    let fecha_vencimiento = match fields.remove(fields::FECHA_VENCIMIENTO) {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) if raw.trim().is_empty() => None,
        Some(Value::String(raw)) => Some(
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| EntryValidationError::InvalidExpiryDate(raw.clone()))?,
        ),
        Some(other) => return Err(EntryValidationError::InvalidExpiryDate(other.to_string())),
    };

    let realiza_registro = match fields.remove(fields::REALIZA_REGISTRO) {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) if name.trim().is_empty() => None,
        Some(Value::String(name)) => Some(name),
        Some(_) => return Err(EntryValidationError::InvalidRegistrant),
    };

    Ok(StockEntryFields {
        insumos,
        cantidad_ingresa_unidades,
        realiza_registro,
        fecha_vencimiento,
        extra: fields,
    })
}

pub fn created_message(count: usize) -> String {
    format!("Se crearon {} registros de entrada", count)
}
