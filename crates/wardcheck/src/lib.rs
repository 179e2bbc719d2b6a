//! Wardcheck: integrity validator for the hourly hospital deterioration dataset.
//!
//! The dataset is a fixed family of five CSV tables joined by `patient_id` and
//! `hour_from_admission`. Wardcheck checks every table against its declared
//! schema, re-verifies the cross-table relationships and derived labels, and
//! makes sure every patient's hourly series is complete.
//!
//! # Core Principles
//!
//! - **Collect everything**: violations are values, a bad row never hides other findings
//! - **Read-only**: input tables are never modified
//! - **Deterministic**: identical inputs produce identical reports
//!
//! # Example
//!
//! ```no_run
//! use wardcheck::{DatasetValidator, ValidatorConfig};
//!
//! let validator = DatasetValidator::with_config(ValidatorConfig::default().with_strict(true));
//! let report = validator.validate_dir("data", None::<&str>).unwrap();
//!
//! println!("Verdict: {}", report.verdict);
//! println!("Errors: {}, warnings: {}", report.counts.errors, report.counts.warnings);
//! ```

pub mod error;
pub mod input;
pub mod report;
pub mod schema;
pub mod validation;

mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use crate::validator::{DatasetValidator, UnknownColumnPolicy, ValidatorConfig, validate};
pub use error::{Result, SchemaError, WardError};
pub use input::{DataTable, Dataset, DatasetLoader, Parser, ParserConfig, SourceMetadata};
pub use report::{Report, Verdict, ViolationCounts, classify_and_report};
pub use schema::{ColumnKind, ColumnSpec, TableName, TableSpec, Value, ValueRange, get_table_spec};
pub use validation::{RowRef, Rule, Severity, Violation};
