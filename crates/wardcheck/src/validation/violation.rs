//! Violation records produced by every validation stage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::TableName;

/// Severity level of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Soft issue. Only fails the run in strict mode.
    Warning,
    /// Definite issue. Always fails the run.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// The rule a violation was raised by.
///
/// Declaration order is the report's rule order within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// A non-nullable cell is empty.
    MissingValue,
    /// A cell does not parse as its declared kind.
    TypeMismatch,
    /// A category outside its allowed set.
    CategoryViolation,
    /// A numeric value outside its soft range.
    RangeViolation,
    /// A repeated key tuple.
    DuplicateKey,
    /// A column the registry does not declare.
    UnknownColumn,
    /// Patient ids missing from `patients` or from a time series.
    ReferentialCoverage,
    /// Per-patient row counts disagree with each other or with `los_hours`.
    RowCountMismatch,
    /// Oxygen device and flow disagree.
    OxygenLinkage,
    /// `deterioration_next_12h` differs from its formula.
    LabelDerivation,
    /// A view's patient-level column differs from `patients`.
    StaticFeatureMismatch,
    /// A view's hourly column differs from its source row.
    SeriesFeatureMismatch,
    /// Patient outcome columns contradict each other.
    OutcomeCoherence,
    /// A derived view cannot be joined back to patients.
    UnjoinableView,
    /// Hours absent from a patient's series.
    MissingHour,
    /// Hours outside `0..los_hours`.
    ExtraHour,
    /// Hours present more than once in a patient's series.
    DuplicateHour,
}

impl Rule {
    /// Severity assigned at detection time.
    ///
    /// Soft ranges and the oxygen linkage are warnings; everything else is an
    /// error. Strict mode does not change this, only how the verdict counts it.
    pub fn default_severity(&self) -> Severity {
        match self {
            Rule::RangeViolation
            | Rule::OxygenLinkage
            | Rule::UnknownColumn
            | Rule::UnjoinableView => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Rule::MissingValue => "Missing Value",
            Rule::TypeMismatch => "Type Mismatch",
            Rule::CategoryViolation => "Category Violation",
            Rule::RangeViolation => "Range Violation",
            Rule::DuplicateKey => "Duplicate Key",
            Rule::UnknownColumn => "Unknown Column",
            Rule::ReferentialCoverage => "Referential Coverage",
            Rule::RowCountMismatch => "Row Count Mismatch",
            Rule::OxygenLinkage => "Oxygen Linkage",
            Rule::LabelDerivation => "Label Derivation",
            Rule::StaticFeatureMismatch => "Static Feature Mismatch",
            Rule::SeriesFeatureMismatch => "Series Feature Mismatch",
            Rule::OutcomeCoherence => "Outcome Coherence",
            Rule::UnjoinableView => "Unjoinable View",
            Rule::MissingHour => "Missing Hour",
            Rule::ExtraHour => "Extra Hour",
            Rule::DuplicateHour => "Duplicate Hour",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies the row a violation points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef {
    /// Zero-based data row index, when the violation is about one row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Key tuple (e.g. patient id and hour).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

impl RowRef {
    /// A specific data row.
    pub fn at(index: usize, key: Vec<String>) -> Self {
        Self {
            index: Some(index),
            key,
        }
    }

    /// A key without a single row (e.g. a whole patient).
    pub fn key(key: Vec<String>) -> Self {
        Self { index: None, key }
    }

    /// A whole patient.
    pub fn patient(patient_id: &str) -> Self {
        Self::key(vec![patient_id.to_string()])
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, self.key.is_empty()) {
            (Some(i), true) => write!(f, "row {}", i + 1),
            (Some(i), false) => write!(f, "row {} ({})", i + 1, self.key.join(", ")),
            (None, false) => write!(f, "({})", self.key.join(", ")),
            (None, true) => f.write_str("table"),
        }
    }
}

/// A single detected deviation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Table the violation is reported against.
    pub table: TableName,
    /// Row the violation points at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<RowRef>,
    /// Affected column, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Rule that raised it.
    pub rule: Rule,
    /// Severity assigned at detection.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Create a violation with the rule's default severity.
    pub fn new(table: TableName, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            table,
            row: None,
            column: None,
            rule,
            severity: rule.default_severity(),
            message: message.into(),
        }
    }

    /// Set the row.
    pub fn with_row(mut self, row: RowRef) -> Self {
        self.row = Some(row);
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.label(), self.table)?;
        if let Some(row) = &self.row {
            write!(f, " {}", row)?;
        }
        if let Some(column) = &self.column {
            write!(f, " {}", column)?;
        }
        write!(f, ": {}", self.message)
    }
}
