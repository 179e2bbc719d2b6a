//! Table-level specifications and the closed set of dataset tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

use super::types::ColumnSpec;

/// The five tables of the dataset.
///
/// Declaration order is the report's table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Patients,
    #[serde(rename = "vitals_timeseries")]
    Vitals,
    #[serde(rename = "labs_timeseries")]
    Labs,
    #[serde(rename = "hospital_deterioration_hourly_panel")]
    HourlyPanel,
    #[serde(rename = "hospital_deterioration_ml_ready")]
    MlReady,
}

impl TableName {
    /// Every table, in report order.
    pub const ALL: [TableName; 5] = [
        TableName::Patients,
        TableName::Vitals,
        TableName::Labs,
        TableName::HourlyPanel,
        TableName::MlReady,
    ];

    /// Canonical name (the CSV file stem).
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Patients => "patients",
            TableName::Vitals => "vitals_timeseries",
            TableName::Labs => "labs_timeseries",
            TableName::HourlyPanel => "hospital_deterioration_hourly_panel",
            TableName::MlReady => "hospital_deterioration_ml_ready",
        }
    }

    /// CSV file name the table is stored under.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    /// Canonical tables must always be present; derived views are optional.
    pub fn is_required(&self) -> bool {
        matches!(self, TableName::Patients | TableName::Vitals | TableName::Labs)
    }

    /// Derived views generated from the canonical tables.
    pub fn is_derived_view(&self) -> bool {
        !self.is_required()
    }

    /// Tables holding one row per patient per hour.
    pub fn is_time_series(&self) -> bool {
        matches!(self, TableName::Vitals | TableName::Labs | TableName::HourlyPanel)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = SchemaError;

    /// Accepts the canonical name or the file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stem = s.trim().strip_suffix(".csv").unwrap_or(s.trim());
        TableName::ALL
            .into_iter()
            .find(|t| t.as_str() == stem)
            .ok_or_else(|| SchemaError::UnknownTable(s.to_string()))
    }
}

/// Specification for an entire table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Which table this describes.
    pub table: TableName,
    /// Column specifications, in file order.
    pub columns: Vec<ColumnSpec>,
    /// Columns whose combined values must be unique. Empty means no key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_columns: Vec<String>,
}

impl TableSpec {
    /// Create a table spec.
    pub fn new(table: TableName, columns: Vec<ColumnSpec>, key_columns: &[&str]) -> Self {
        Self {
            table,
            columns,
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get all column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check whether a column is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Non-key columns.
    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns
            .iter()
            .filter(|c| !self.key_columns.contains(&c.name))
    }
}
