//! Laboratory staff (Equipo Laboratorio), listed as possible registrants.

use serde::{Deserialize, Serialize};

use crate::record_store::Record;

pub mod fields {
    pub const NOMBRE: &str = "Nombre";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffFields {
    #[serde(rename = "Nombre", default)]
    pub nombre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsable {
    pub id: String,
    pub nombre: String,
}

/// Keeps named staff not on the exclusion list, in the store's order
pub fn responsables_from(records: Vec<Record<StaffFields>>, excluded: &[&str]) -> Vec<Responsable> {
    records
        .into_iter()
        .filter(|record| !excluded.contains(&record.id.as_str()))
        .filter_map(|record| {
            let nombre = record.fields.nombre?.trim().to_string();
            (!nombre.is_empty()).then(|| Responsable {
                id: record.id,
                nombre,
            })
        })
        .collect()
}
