//! Row-level validation of a single table against its specification.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchemaError;
use crate::input::DataTable;
use crate::schema::{ColumnKind, ColumnSpec, TableSpec, Value, is_missing};

use super::violation::{RowRef, Rule, Violation};

/// What to do with columns a table carries but the registry does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownColumnPolicy {
    /// Skip them silently.
    #[default]
    Ignore,
    /// Report each one as a warning.
    Flag,
}

/// Applies a table specification to every row.
#[derive(Debug, Clone, Default)]
pub struct RowValidator {
    unknown_columns: UnknownColumnPolicy,
}

/// Declared column resolved to its position in the table.
struct BoundColumn<'a> {
    spec: &'a ColumnSpec,
    index: usize,
}

impl RowValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-column policy.
    pub fn with_unknown_columns(mut self, policy: UnknownColumnPolicy) -> Self {
        self.unknown_columns = policy;
        self
    }

    /// Validate every row of `table`.
    ///
    /// Fails with [`SchemaError::MissingColumns`] when declared columns are
    /// absent from the header; all other findings are returned as violations.
    pub fn validate(
        &self,
        table: &DataTable,
        spec: &TableSpec,
    ) -> Result<Vec<Violation>, SchemaError> {
        let columns = bind_columns(table, spec)?;
        let key_positions: Vec<(usize, ColumnKind)> = spec
            .key_columns
            .iter()
            .filter_map(|name| {
                columns
                    .iter()
                    .find(|c| &c.spec.name == name)
                    .map(|c| (c.index, c.spec.kind))
            })
            .collect();

        let mut violations = Vec::new();

        if self.unknown_columns == UnknownColumnPolicy::Flag {
            for header in &table.headers {
                if !spec.declares(header) {
                    violations.push(
                        Violation::new(
                            spec.table,
                            Rule::UnknownColumn,
                            format!("column '{}' is not declared for this table", header),
                        )
                        .with_column(header.clone()),
                    );
                }
            }
        }

        for row_idx in 0..table.row_count() {
            let row_ref = || RowRef::at(row_idx, row_key(table, row_idx, &key_positions));
            for column in &columns {
                let raw = table.get(row_idx, column.index).unwrap_or("");
                if let Some(violation) = check_cell(spec, column.spec, raw) {
                    violations.push(
                        violation
                            .with_row(row_ref())
                            .with_column(column.spec.name.clone()),
                    );
                }
            }
        }

        violations.extend(find_duplicate_keys(table, spec, &key_positions));

        debug!(
            table = %spec.table,
            rows = table.row_count(),
            violations = violations.len(),
            "row validation complete"
        );

        Ok(violations)
    }
}

/// Validate `table` against `spec` with default settings.
pub fn validate_rows(table: &DataTable, spec: &TableSpec) -> Result<Vec<Violation>, SchemaError> {
    RowValidator::new().validate(table, spec)
}

fn bind_columns<'a>(
    table: &DataTable,
    spec: &'a TableSpec,
) -> Result<Vec<BoundColumn<'a>>, SchemaError> {
    let mut bound = Vec::with_capacity(spec.columns.len());
    let mut missing = Vec::new();

    for column in &spec.columns {
        match table.column_index(&column.name) {
            Some(index) => bound.push(BoundColumn { spec: column, index }),
            None => missing.push(column.name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(bound)
    } else {
        Err(SchemaError::MissingColumns {
            table: spec.table,
            columns: missing,
        })
    }
}

/// Check one cell: presence, kind, category membership, then range.
fn check_cell(spec: &TableSpec, column: &ColumnSpec, raw: &str) -> Option<Violation> {
    if is_missing(raw) {
        if column.nullable {
            return None;
        }
        return Some(Violation::new(
            spec.table,
            Rule::MissingValue,
            format!("{} is missing", column.name),
        ));
    }

    let Some(value) = column.kind.parse(raw) else {
        return Some(Violation::new(
            spec.table,
            Rule::TypeMismatch,
            format!(
                "{} value '{}' is not a valid {}",
                column.name,
                raw.trim(),
                column.kind
            ),
        ));
    };

    if let Value::Category(text) = &value {
        if !column.allows(text) {
            let allowed = column.allowed_values.as_deref().unwrap_or_default();
            return Some(Violation::new(
                spec.table,
                Rule::CategoryViolation,
                format!(
                    "{} value '{}' not in allowed set {{{}}}",
                    column.name,
                    text,
                    allowed.join(", ")
                ),
            ));
        }
    }

    if let (Some(range), Some(number)) = (column.range, value.as_f64()) {
        if !range.contains(number) {
            return Some(Violation::new(
                spec.table,
                Rule::RangeViolation,
                format!("{} value {} outside expected range {}", column.name, value, range),
            ));
        }
    }

    None
}

/// Key tuple of a row, normalized so `5` and `5.0` compare equal.
fn row_key(table: &DataTable, row: usize, key_positions: &[(usize, ColumnKind)]) -> Vec<String> {
    key_positions
        .iter()
        .map(|&(index, kind)| {
            let raw = table.get(row, index).unwrap_or("");
            match table.typed(row, index, kind) {
                Some(value) => value.to_string(),
                None => raw.trim().to_string(),
            }
        })
        .collect()
}

/// Every occurrence of a key tuple after the first is an error.
fn find_duplicate_keys(
    table: &DataTable,
    spec: &TableSpec,
    key_positions: &[(usize, ColumnKind)],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if key_positions.is_empty() {
        return violations;
    }

    let mut first_seen: IndexMap<Vec<String>, usize> = IndexMap::new();
    for row_idx in 0..table.row_count() {
        let key = row_key(table, row_idx, key_positions);
        if let Some(&first) = first_seen.get(&key) {
            violations.push(
                Violation::new(
                    spec.table,
                    Rule::DuplicateKey,
                    format!(
                        "duplicate key ({}) for [{}], first seen at row {}",
                        key.join(", "),
                        spec.key_columns.join(", "),
                        first + 1
                    ),
                )
                .with_row(RowRef::at(row_idx, key)),
            );
        } else {
            first_seen.insert(key, row_idx);
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::schema::TableName;
    use crate::validation::Severity;

    #[test]
    fn test_clean_tables_have_no_violations() {
        let dataset = fixtures::dataset(&[("P1", 14, 10), ("P2", 20, -1)]);
        for (name, table) in dataset.iter() {
            let violations = validate_rows(table, name.spec()).unwrap();
            assert!(violations.is_empty(), "{name}: {violations:?}");
        }
    }

    #[test]
    fn test_range_is_warning() {
        let mut dataset = fixtures::dataset(&[("P1", 14, -1)]);
        fixtures::set(&mut dataset, TableName::Vitals, 3, "heart_rate", "-5");

        let violations =
            validate_rows(dataset.get(TableName::Vitals).unwrap(), TableName::Vitals.spec())
                .unwrap();
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.rule, Rule::RangeViolation);
        assert_eq!(v.severity, Severity::Warning);
        assert_eq!(v.column.as_deref(), Some("heart_rate"));
        assert_eq!(v.row, Some(RowRef::at(3, vec!["P1".into(), "3".into()])));
    }

    #[test]
    fn test_category_is_error() {
        let mut dataset = fixtures::dataset(&[("P1", 14, -1)]);
        fixtures::set(&mut dataset, TableName::Patients, 0, "gender", "X");

        let violations = validate_rows(
            dataset.get(TableName::Patients).unwrap(),
            TableName::Patients.spec(),
        )
        .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::CategoryViolation);
        assert_eq!(violations[0].severity, Severity::Error);
        assert!(violations[0].message.contains("'X'"));
    }

    #[test]
    fn test_missing_and_type_errors() {
        let mut dataset = fixtures::dataset(&[("P1", 14, -1)]);
        fixtures::set(&mut dataset, TableName::Labs, 0, "lactate", "");
        fixtures::set(&mut dataset, TableName::Labs, 1, "creatinine", "high");
        fixtures::set(&mut dataset, TableName::Labs, 2, "hour_from_admission", "2.5");

        let violations =
            validate_rows(dataset.get(TableName::Labs).unwrap(), TableName::Labs.spec()).unwrap();
        let rules: Vec<Rule> = violations.iter().map(|v| v.rule).collect();
        assert_eq!(
            rules,
            vec![Rule::MissingValue, Rule::TypeMismatch, Rule::TypeMismatch]
        );
        assert!(violations.iter().all(Violation::is_error));
    }

    #[test]
    fn test_oxygen_device_none_is_not_missing() {
        let dataset = fixtures::dataset(&[("P1", 12, -1)]);
        let vitals = dataset.get(TableName::Vitals).unwrap();
        let idx = vitals.column_index("oxygen_device").unwrap();
        assert_eq!(vitals.get(0, idx), Some("none"));
        assert!(validate_rows(vitals, TableName::Vitals.spec()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_keys() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Vitals, 5, "hour_from_admission", "4.0");
        fixtures::set(&mut dataset, TableName::Vitals, 6, "hour_from_admission", "4");

        let violations =
            validate_rows(dataset.get(TableName::Vitals).unwrap(), TableName::Vitals.spec())
                .unwrap();
        let dups: Vec<_> = violations
            .iter()
            .filter(|v| v.rule == Rule::DuplicateKey)
            .collect();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].row, Some(RowRef::at(5, vec!["P1".into(), "4".into()])));
        assert!(dups[0].message.contains("first seen at row 5"));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        let labs = dataset.get_mut(TableName::Labs).unwrap();
        labs.headers[2] = "wbc".to_string();

        let err = validate_rows(labs, TableName::Labs.spec()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns {
                table: TableName::Labs,
                columns: vec!["wbc_count".to_string()],
            }
        );
    }

    #[test]
    fn test_unknown_columns_flagged_on_request() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        let patients = dataset.get_mut(TableName::Patients).unwrap();
        patients.headers.push("ward".to_string());
        for row in &mut patients.rows {
            row.push("B2".to_string());
        }

        assert!(validate_rows(patients, TableName::Patients.spec()).unwrap().is_empty());

        let flagged = RowValidator::new()
            .with_unknown_columns(UnknownColumnPolicy::Flag)
            .validate(patients, TableName::Patients.spec())
            .unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].rule, Rule::UnknownColumn);
        assert_eq!(flagged[0].severity, Severity::Warning);
    }
}
