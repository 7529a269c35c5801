use crate::models::entrada::fields as entrada_fields;

/// Ascending sort on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

/// Parameters of a list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Restricts the returned columns
    pub fields: Vec<String>,
    pub max_records: Option<u32>,
    pub filter_by_formula: Option<String>,
    pub sort: Vec<Sort>,
    /// Pagination cursor from the previous page
    pub offset: Option<String>,
}

impl ListQuery {
    /// Stock entries, earliest expiry first
    ///
    /// The ascending `fecha_vencimiento` sort is applied whatever the filter,
    /// since expiry-aware consumers take stock in result order.
    pub fn for_entries(filter: &EntryFilter, max_records: u32) -> Self {
        Self {
            max_records: Some(max_records),
            filter_by_formula: filter.formula(),
            sort: vec![Sort::asc(entrada_fields::FECHA_VENCIMIENTO)],
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_formula(mut self, formula: Option<String>) -> Self {
        self.filter_by_formula = formula;
        self
    }

    /// Encodes the query in the store's bracketed parameter syntax
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        for field in &self.fields {
            pairs.push(("fields[]".to_string(), field.clone()));
        }
        if let Some(max) = self.max_records {
            pairs.push(("maxRecords".to_string(), max.to_string()));
        }
        if let Some(formula) = &self.filter_by_formula {
            pairs.push(("filterByFormula".to_string(), formula.clone()));
        }
        for (i, sort) in self.sort.iter().enumerate() {
            pairs.push((format!("sort[{}][field]", i), sort.field.clone()));
            pairs.push((format!("sort[{}][direction]", i), "asc".to_string()));
        }
        if let Some(offset) = &self.offset {
            pairs.push(("offset".to_string(), offset.clone()));
        }

        pairs
    }
}

/// Narrowing applied when listing stock entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Only entries linked to this supply item
    pub insumo_id: Option<String>,
    /// Only entries with remaining bulk quantity
    pub solo_disponibles: bool,
}

impl EntryFilter {
    pub fn new(insumo_id: Option<String>, solo_disponibles: bool) -> Self {
        Self {
            insumo_id: insumo_id.filter(|id| !id.is_empty()),
            solo_disponibles,
        }
    }

    /// `None` when nothing was requested, so no filter parameter is sent
    pub fn formula(&self) -> Option<String> {
        let reference = self.insumo_id.as_deref().map(|id| {
            format!(
                "FIND({}, CONCATENATE({{{}}}))",
                quote(id),
                entrada_fields::INSUMOS_LABORATORIO
            )
        });
        let available = self
            .solo_disponibles
            .then(|| format!("{{{}}} > 0", entrada_fields::TOTAL_GRANEL_ACTUAL));

        match (reference, available) {
            (Some(reference), Some(available)) => {
                Some(format!("AND({}, {})", reference, available))
            }
            (Some(single), None) | (None, Some(single)) => Some(single),
            (None, None) => None,
        }
    }
}

/// Single-quoted formula string literal
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// `{column} = 'value'`
pub fn equals(column: &str, value: &str) -> String {
    format!("{{{}}} = {}", column, quote(value))
}
