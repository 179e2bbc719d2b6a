//! Error types for the wardcheck library.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::TableName;

/// Input shape errors. Any of these makes further checking of the affected
/// table meaningless, so they abort the run instead of becoming violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A table name that is not part of the dataset.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// A required table was not supplied.
    #[error("required table '{0}' is missing")]
    MissingTable(TableName),

    /// A table lacks declared columns entirely.
    #[error("{table}: missing columns: {}", .columns.join(", "))]
    MissingColumns {
        table: TableName,
        columns: Vec<String>,
    },
}

/// Main error type for wardcheck operations.
#[derive(Debug, Error)]
pub enum WardError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File without a header row.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single schema error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Schema errors gathered across all tables of a run.
    #[error("{} schema error(s): {}", .0.len(), join_schema_errors(.0))]
    SchemaErrors(Vec<SchemaError>),
}

fn join_schema_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for wardcheck operations.
pub type Result<T> = std::result::Result<T, WardError>;
