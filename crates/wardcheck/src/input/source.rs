//! Data source abstraction and metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{ColumnKind, Value, is_missing, parse_binary, parse_float, parse_integer};

/// Metadata about a loaded source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Parsed tabular data. Cells are kept as text and typed on access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Create a new data table.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from string slices.
    pub fn from_rows(headers: &[&str], rows: &[Vec<String>]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.to_vec(),
        )
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col).map(|s| s.as_str()))
    }

    /// Trimmed cell text, `None` when missing.
    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.get(row, col)
            .filter(|v| !is_missing(v))
            .map(str::trim)
    }

    /// Cell parsed as an integer.
    pub fn integer(&self, row: usize, col: usize) -> Option<i64> {
        self.text(row, col).and_then(parse_integer)
    }

    /// Cell parsed as a float.
    pub fn float(&self, row: usize, col: usize) -> Option<f64> {
        self.text(row, col).and_then(parse_float)
    }

    /// Cell parsed as a 0/1 flag.
    pub fn flag(&self, row: usize, col: usize) -> Option<bool> {
        self.text(row, col).and_then(parse_binary)
    }

    /// Cell parsed according to a column kind.
    pub fn typed(&self, row: usize, col: usize, kind: ColumnKind) -> Option<Value> {
        self.text(row, col).and_then(|v| kind.parse(v))
    }
}
