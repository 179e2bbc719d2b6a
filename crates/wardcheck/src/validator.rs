//! Orchestrates a full validation run.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SchemaError, WardError};
use crate::input::{DataTable, Dataset, DatasetLoader, ParserConfig};
use crate::report::{Report, classify_and_report};
use crate::schema::TableName;
use crate::validation::{
    AlignmentChecker, CheckContext, ConsistencyChecker, RowValidator, Violation,
};

pub use crate::validation::UnknownColumnPolicy;

/// Configuration for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Count warnings toward the verdict.
    pub strict: bool,
    /// Treatment of columns the registry does not declare.
    pub unknown_columns: UnknownColumnPolicy,
    /// Parser settings used when loading from disk.
    pub parser: ParserConfig,
}

impl ValidatorConfig {
    /// Load a configuration from a JSON file. Absent fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| WardError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content)
            .map_err(|e| WardError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_unknown_columns(mut self, policy: UnknownColumnPolicy) -> Self {
        self.unknown_columns = policy;
        self
    }

    pub fn with_parser(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }
}

/// Runs every validation stage over a dataset.
///
/// Stages: required tables, row validation, then cross-table consistency and
/// temporal alignment, then the report. Input tables are never modified.
#[derive(Debug, Clone, Default)]
pub struct DatasetValidator {
    config: ValidatorConfig,
    rows: RowValidator,
}

impl DatasetValidator {
    /// Create a validator with default configuration.
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidatorConfig) -> Self {
        let rows = RowValidator::new().with_unknown_columns(config.unknown_columns);
        Self { config, rows }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Load a dataset directory and validate it.
    pub fn validate_dir(
        &self,
        data_dir: impl AsRef<Path>,
        views_dir: Option<impl AsRef<Path>>,
    ) -> Result<Report> {
        let dataset =
            DatasetLoader::with_config(self.config.parser.clone()).load_dir(data_dir, views_dir)?;
        self.validate(&dataset)
    }

    /// Validate an in-memory dataset.
    ///
    /// Fails only on schema errors: missing required tables or missing
    /// declared columns. Every other finding is a violation in the report.
    pub fn validate(&self, dataset: &Dataset) -> Result<Report> {
        let missing: Vec<SchemaError> = dataset
            .missing_required()
            .into_iter()
            .map(SchemaError::MissingTable)
            .collect();
        if !missing.is_empty() {
            return Err(WardError::SchemaErrors(missing));
        }

        let mut violations = self.validate_rows(dataset)?;
        info!(
            tables = dataset.table_names().len(),
            violations = violations.len(),
            "row validation complete"
        );

        let ctx = CheckContext::new(dataset);
        let (consistency, alignment) = rayon::join(
            || ConsistencyChecker::new().check_with(&ctx),
            || AlignmentChecker::new().check_with(dataset, &ctx.patients),
        );
        info!(
            consistency = consistency.len(),
            alignment = alignment.len(),
            "cross-table checks complete"
        );
        violations.extend(consistency);
        violations.extend(alignment);

        let report = classify_and_report(violations, self.config.strict);
        info!(
            verdict = %report.verdict,
            errors = report.counts.errors,
            warnings = report.counts.warnings,
            strict = self.config.strict,
            "validation complete"
        );
        Ok(report)
    }

    /// Row-validate every table in parallel; gather all schema errors.
    fn validate_rows(&self, dataset: &Dataset) -> Result<Vec<Violation>> {
        let tables: Vec<(TableName, &DataTable)> = dataset.iter().collect();
        let results: Vec<std::result::Result<Vec<Violation>, SchemaError>> = tables
            .par_iter()
            .map(|&(name, table)| self.rows.validate(table, name.spec()))
            .collect();

        let mut violations = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(found) => violations.extend(found),
                Err(e) => {
                    debug!(error = %e, "schema error");
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(violations)
        } else {
            Err(WardError::SchemaErrors(errors))
        }
    }
}

/// Validate named tables in one call.
///
/// Names are canonical table names or file names; anything outside the
/// registry is a [`SchemaError::UnknownTable`].
pub fn validate<I, S>(tables: I, config: &ValidatorConfig) -> Result<Report>
where
    I: IntoIterator<Item = (S, DataTable)>,
    S: AsRef<str>,
{
    let dataset = Dataset::from_named(tables)?;
    DatasetValidator::with_config(config.clone()).validate(&dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::report::Verdict;
    use crate::schema::{OXYGEN_FLOW, PATIENT_ID};
    use crate::validation::Rule;
    use tempfile::TempDir;

    #[test]
    fn test_clean_dataset_passes() {
        let dataset = fixtures::dataset(&[("P1", 14, 10), ("P2", 20, -1)]);
        let report = DatasetValidator::new().validate(&dataset).unwrap();
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_missing_required_table() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        dataset.remove(TableName::Labs);
        let err = DatasetValidator::new().validate(&dataset).unwrap_err();
        assert!(matches!(
            err,
            WardError::SchemaErrors(ref errors)
                if errors == &vec![SchemaError::MissingTable(TableName::Labs)]
        ));
    }

    #[test]
    fn test_schema_errors_gathered_across_tables() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        dataset.get_mut(TableName::Patients).unwrap().headers[1] = "age_years".into();
        dataset.get_mut(TableName::Vitals).unwrap().headers[2] = "hr".into();

        match DatasetValidator::new().validate(&dataset) {
            Err(WardError::SchemaErrors(errors)) => {
                let tables: Vec<_> = errors
                    .iter()
                    .map(|e| match e {
                        SchemaError::MissingColumns { table, .. } => *table,
                        other => panic!("unexpected {other:?}"),
                    })
                    .collect();
                assert_eq!(tables, vec![TableName::Patients, TableName::Vitals]);
            }
            other => panic!("expected schema errors, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_only_changes_verdict() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Vitals, 0, OXYGEN_FLOW, "2.0");

        let lenient = DatasetValidator::new().validate(&dataset).unwrap();
        let strict = DatasetValidator::with_config(ValidatorConfig::default().with_strict(true))
            .validate(&dataset)
            .unwrap();

        assert_eq!(lenient.verdict, Verdict::Pass);
        assert_eq!(strict.verdict, Verdict::Fail);
        assert_eq!(lenient.violations, strict.violations);
    }

    #[test]
    fn test_validate_named_tables() {
        let dataset = fixtures::dataset(&[("P1", 12, -1)]);
        let named: Vec<(String, DataTable)> = dataset
            .iter()
            .map(|(name, table)| (name.file_name(), table.clone()))
            .collect();
        let report = validate(named, &ValidatorConfig::default()).unwrap();
        assert!(report.is_pass());

        let err = validate(
            vec![("icu_stays", DataTable::default())],
            &ValidatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, WardError::Schema(SchemaError::UnknownTable(_))));
    }

    #[test]
    fn test_cross_table_findings_reported_together() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1), ("P2", 12, -1)]);
        fixtures::drop_rows(&mut dataset, TableName::Vitals, "P2", &[11]);
        let last = dataset.get(TableName::Labs).unwrap().row_count() - 1;
        fixtures::set(&mut dataset, TableName::Labs, last, PATIENT_ID, "P3");

        let report = DatasetValidator::new().validate(&dataset).unwrap();
        let rules: Vec<(TableName, Rule)> =
            report.violations.iter().map(|v| (v.table, v.rule)).collect();
        assert!(rules.contains(&(TableName::Patients, Rule::RowCountMismatch)));
        assert!(rules.contains(&(TableName::Vitals, Rule::MissingHour)));
        assert!(rules.contains(&(TableName::Labs, Rule::ReferentialCoverage)));
        assert_eq!(report.verdict, Verdict::Fail);
    }

    #[test]
    fn test_config_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wardcheck.json");
        fs::write(&path, r#"{"strict": true, "unknown_columns": "flag"}"#).unwrap();

        let config = ValidatorConfig::load(&path).unwrap();
        assert!(config.strict);
        assert_eq!(config.unknown_columns, UnknownColumnPolicy::Flag);
        assert_eq!(config.parser, ParserConfig::default());

        fs::write(&path, r#"{"strict": "yes"}"#).unwrap();
        assert!(matches!(ValidatorConfig::load(&path), Err(WardError::Config(_))));
    }
}
