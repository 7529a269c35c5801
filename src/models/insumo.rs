//! Supply items (Insumos Laboratorio) and their stock classification.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use validator::{Validate, ValidationError};

use crate::record_store::{equals, Fields};

/// Column labels of the supply items table
pub mod fields {
    pub const NOMBRE: &str = "nombre";
    pub const CATEGORIA: &str = "categoria_insumo";
    pub const UNIDAD_MEDIDA: &str = "unidad_medida";
    pub const RANGO_MINIMO_STOCK: &str = "Rango Minimo Stock";
    pub const TOTAL_UNIDADES: &str = "Total Insumo Unidades";
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum Category {
    #[serde(rename = "Materiales y Suministros Generales")]
    #[strum(serialize = "Materiales y Suministros Generales")]
    MaterialesGenerales,

    #[serde(rename = "Reactivos y Químicos")]
    #[strum(serialize = "Reactivos y Químicos")]
    ReactivosQuimicos,

    #[serde(rename = "Equipo de Protección Personal")]
    #[strum(serialize = "Equipo de Protección Personal")]
    ProteccionPersonal,

    #[serde(rename = "Productos de Limpieza y Desinfección")]
    #[strum(serialize = "Productos de Limpieza y Desinfección")]
    LimpiezaDesinfeccion,

    #[serde(rename = "Equipos y Herramientas")]
    #[strum(serialize = "Equipos y Herramientas")]
    EquiposHerramientas,

    #[serde(rename = "Material de Laboratorio")]
    #[strum(serialize = "Material de Laboratorio")]
    MaterialLaboratorio,

    #[serde(rename = "Contenedores y Almacenamiento")]
    #[strum(serialize = "Contenedores y Almacenamiento")]
    ContenedoresAlmacenamiento,

    #[serde(rename = "Equipos de Laboratorio")]
    #[strum(serialize = "Equipos de Laboratorio")]
    EquiposLaboratorio,
}

impl Category {
    /// Everyday consumables shown under the "todos" view
    pub const BASIC: [Category; 2] = [Category::MaterialesGenerales, Category::ProteccionPersonal];
}

/// Category narrowing requested by a stock listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Basic,
    Only(Category),
}

impl CategoryFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") | Some("ver-todas") => Ok(Self::All),
            Some("todos") => Ok(Self::Basic),
            Some(name) => name
                .parse::<Category>()
                .map(Self::Only)
                .map_err(|_| format!("Categoría desconocida: {}", name)),
        }
    }

    pub fn formula(&self) -> Option<String> {
        match self {
            Self::All => None,
            Self::Basic => {
                let conditions: Vec<String> = Category::BASIC
                    .iter()
                    .map(|c| equals(fields::CATEGORIA, c.as_ref()))
                    .collect();
                Some(format!("OR({})", conditions.join(", ")))
            }
            Self::Only(category) => Some(equals(fields::CATEGORIA, category.as_ref())),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum UnitOfMeasure {
    #[serde(rename = "Unidad (Und)")]
    #[strum(serialize = "Unidad (Und)")]
    Unidad,

    #[serde(rename = "Gramos (Gr)")]
    #[strum(serialize = "Gramos (Gr)")]
    Gramos,

    #[serde(rename = "Mililitros (Ml)")]
    #[strum(serialize = "Mililitros (Ml)")]
    Mililitros,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum StockState {
    Agotado,
    #[serde(rename = "Poco Stock")]
    #[strum(serialize = "Poco Stock")]
    PocoStock,
    Disponible,
}

impl StockState {
    /// Exhausted at or below zero, low below the minimum, available otherwise
    pub fn classify(current: f64, minimum: f64) -> Self {
        if current <= 0.0 {
            StockState::Agotado
        } else if current < minimum {
            StockState::PocoStock
        } else {
            StockState::Disponible
        }
    }
}

/// Supply item columns as read back from the store.
///
/// Rollup columns sometimes come back as lists or text, so numbers and text
/// are read leniently; anything unreadable counts as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplyItemFields {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub categoria_insumo: Option<String>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub unidad_medida: Option<String>,

    #[serde(
        rename = "Unidad Ingresa Insumo",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unidad_presentacion: Option<String>,

    #[serde(
        rename = "Cantidad Presentacion Insumo",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cantidad_presentacion: Option<f64>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,

    #[serde(
        rename = "Rango Minimo Stock",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub rango_minimo_stock: Option<f64>,

    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,

    #[serde(
        rename = "Total Insumo Unidades",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_unidades: Option<f64>,

    #[serde(
        rename = "Total Insumo Granel",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_granel: Option<f64>,

    #[serde(flatten)]
    pub extra: Fields,
}

impl SupplyItemFields {
    pub fn stock_state(&self) -> StockState {
        StockState::classify(
            self.total_unidades.unwrap_or_default(),
            self.rango_minimo_stock.unwrap_or_default(),
        )
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => items.first().and_then(Value::as_f64),
        _ => None,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

/// Stock counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub total: usize,
    pub agotados: usize,
    pub poco_stock: usize,
    pub disponibles: usize,
}

impl StockSummary {
    pub fn tally<I: IntoIterator<Item = StockState>>(states: I) -> Self {
        states.into_iter().fold(Self::default(), |mut acc, state| {
            acc.total += 1;
            match state {
                StockState::Agotado => acc.agotados += 1,
                StockState::PocoStock => acc.poco_stock += 1,
                StockState::Disponible => acc.disponibles += 1,
            }
            acc
        })
    }
}

/// Body of the create-supply-item endpoint
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSupplyItemRequest {
    #[validate(custom = "not_blank")]
    pub nombre: String,

    pub categoria_insumo: Category,

    pub unidad_medida: UnitOfMeasure,

    #[serde(default)]
    pub descripcion: Option<String>,

    #[serde(rename = "rangoMinimoStock")]
    #[validate(range(min = 0.0))]
    pub rango_minimo_stock: f64,

    /// New items start as available unless stated
    #[serde(default)]
    pub estado: Option<StockState>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("El nombre del insumo es obligatorio".into());
        return Err(err);
    }
    Ok(())
}

/// Columns written when a supply item is created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSupplyItemFields {
    pub nombre: String,
    pub categoria_insumo: Category,
    pub unidad_medida: UnitOfMeasure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(rename = "Rango Minimo Stock")]
    pub rango_minimo_stock: f64,
    pub estado: StockState,
}

impl From<NewSupplyItemRequest> for NewSupplyItemFields {
    fn from(req: NewSupplyItemRequest) -> Self {
        Self {
            nombre: req.nombre.trim().to_string(),
            categoria_insumo: req.categoria_insumo,
            unidad_medida: req.unidad_medida,
            descripcion: req
                .descripcion
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            rango_minimo_stock: req.rango_minimo_stock,
            estado: req.estado.unwrap_or(StockState::Disponible),
        }
    }
}
