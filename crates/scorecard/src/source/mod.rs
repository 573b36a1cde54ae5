//! Raw upstream records as delivered by the extraction stage.
//!
//! Records stay loosely typed here; the transform parses them into typed
//! entities exactly once (see `transform::domain`).

pub mod appsheet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

pub use appsheet::{AppSheetClient, ExtractError};

/// Column holding the upstream primary key of every table.
pub const ROW_ID: &str = "Row ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceTable {
    Providers,
    ProviderTypes,
    Users,
    Roles,
    EvaluationPeriods,
    EvaluationPlans,
    WorkSites,
    TypeRoleLinks,
    SubmittedEvaluations,
    ScoreDefinitions,
    Criteria,
    SiteAssignments,
}

impl SourceTable {
    pub const fn ordered() -> [Self; 12] {
        [
            Self::Providers,
            Self::ProviderTypes,
            Self::Users,
            Self::Roles,
            Self::EvaluationPeriods,
            Self::EvaluationPlans,
            Self::WorkSites,
            Self::TypeRoleLinks,
            Self::SubmittedEvaluations,
            Self::ScoreDefinitions,
            Self::Criteria,
            Self::SiteAssignments,
        ]
    }

    /// Table name in the upstream application.
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::Providers => "proveedores",
            Self::ProviderTypes => "tipos_de_proveedores",
            Self::Users => "usuarios",
            Self::Roles => "roles",
            Self::EvaluationPeriods => "cortes_de_evaluacion",
            Self::EvaluationPlans => "planes_de_evaluacion",
            Self::WorkSites => "obras",
            Self::TypeRoleLinks => "tipo_proveedor_rol_criterio",
            Self::SubmittedEvaluations => "evaluaciones",
            Self::ScoreDefinitions => "tipo_proveedor_criterios_puntajes",
            Self::Criteria => "criterios_de_evaluacion",
            Self::SiteAssignments => "usuarios_obras",
        }
    }

    pub fn from_native_name(name: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|table| table.native_name() == name.trim())
    }

    /// Tables without which no join in the transform is meaningful.
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Providers | Self::Roles)
    }
}

/// One flat upstream row keyed by native column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Option<String> {
        self.text(ROW_ID)
    }

    /// Trimmed textual value of `column`; `None` for absent, null or blank cells.
    pub fn text(&self, column: &str) -> Option<String> {
        let rendered = match self.0.get(column)? {
            Value::String(value) => value.trim().to_string(),
            Value::Number(value) => value.to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => return None,
        };
        Some(rendered).filter(|value| !value.is_empty())
    }

    /// Splits a comma-separated "Related ..." column into trimmed, non-empty ids.
    pub fn list(&self, column: &str) -> Vec<String> {
        self.text(column)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Numeric value of `column`, accepting JSON numbers and numeric text.
    pub fn number(&self, column: &str) -> Option<f64> {
        let parsed = match self.0.get(column)? {
            Value::Number(value) => value.as_f64(),
            Value::String(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|value| value.is_finite())
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Named record collections handed over by the extraction stage.
///
/// An absent table and an empty table are different: the former is a
/// configuration problem when the table is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<RawRecord>>",
    into = "BTreeMap<String, Vec<RawRecord>>"
)]
pub struct SourceTables {
    tables: BTreeMap<SourceTable, Vec<RawRecord>>,
}

impl SourceTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: SourceTable, records: Vec<RawRecord>) {
        self.tables.insert(table, records);
    }

    pub fn with(mut self, table: SourceTable, records: Vec<RawRecord>) -> Self {
        self.insert(table, records);
        self
    }

    pub fn get(&self, table: SourceTable) -> Option<&[RawRecord]> {
        self.tables.get(&table).map(Vec::as_slice)
    }

    /// Records of `table`, empty when the table was never delivered.
    pub fn records(&self, table: SourceTable) -> &[RawRecord] {
        self.get(table).unwrap_or(&[])
    }

    pub fn contains(&self, table: SourceTable) -> bool {
        self.tables.contains_key(&table)
    }

    pub fn total_records(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

impl From<BTreeMap<String, Vec<RawRecord>>> for SourceTables {
    fn from(value: BTreeMap<String, Vec<RawRecord>>) -> Self {
        let mut tables = BTreeMap::new();
        for (name, records) in value {
            match SourceTable::from_native_name(&name) {
                Some(table) => {
                    tables.insert(table, records);
                }
                None => warn!(table = %name, "ignoring unknown source table"),
            }
        }
        Self { tables }
    }
}

impl From<SourceTables> for BTreeMap<String, Vec<RawRecord>> {
    fn from(value: SourceTables) -> Self {
        value
            .tables
            .into_iter()
            .map(|(table, records)| (table.native_name().to_string(), records))
            .collect()
    }
}
