//! The set of tables making up one validation run, and loading it from disk.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::parser::{Parser, ParserConfig};
use super::source::{DataTable, SourceMetadata};
use crate::error::{Result, SchemaError, WardError};
use crate::schema::TableName;

/// Directory the view builder writes derived views to, relative to the data directory's parent.
const GENERATED_DIR: &str = "generated";

/// Tables keyed by their registered name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    tables: IndexMap<TableName, DataTable>,
    sources: IndexMap<TableName, SourceMetadata>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from named tables, rejecting names outside the registry.
    pub fn from_named<I, S>(tables: I) -> std::result::Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, DataTable)>,
        S: AsRef<str>,
    {
        let mut dataset = Self::new();
        for (name, table) in tables {
            dataset.insert_named(name.as_ref(), table)?;
        }
        Ok(dataset)
    }

    /// Add a table under its registered name.
    pub fn insert(&mut self, name: TableName, table: DataTable) -> &mut Self {
        self.tables.insert(name, table);
        self
    }

    /// Add a table by canonical name or file name.
    pub fn insert_named(
        &mut self,
        name: &str,
        table: DataTable,
    ) -> std::result::Result<&mut Self, SchemaError> {
        let name = name.parse::<TableName>()?;
        Ok(self.insert(name, table))
    }

    /// Builder form of [`Dataset::insert`].
    pub fn with_table(mut self, name: TableName, table: DataTable) -> Self {
        self.insert(name, table);
        self
    }

    /// Remove a table.
    pub fn remove(&mut self, name: TableName) -> Option<DataTable> {
        self.tables.shift_remove(&name)
    }

    /// Get a table.
    pub fn get(&self, name: TableName) -> Option<&DataTable> {
        self.tables.get(&name)
    }

    /// Get a table for in-place edits.
    pub fn get_mut(&mut self, name: TableName) -> Option<&mut DataTable> {
        self.tables.get_mut(&name)
    }

    /// Check whether a table is present.
    pub fn contains(&self, name: TableName) -> bool {
        self.tables.contains_key(&name)
    }

    /// Iterate tables in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (TableName, &DataTable)> {
        TableName::ALL
            .into_iter()
            .filter_map(|name| self.tables.get(&name).map(|t| (name, t)))
    }

    /// Names of the present tables, in registry order.
    pub fn table_names(&self) -> Vec<TableName> {
        self.iter().map(|(name, _)| name).collect()
    }

    /// Required tables that were not supplied.
    pub fn missing_required(&self) -> Vec<TableName> {
        TableName::ALL
            .into_iter()
            .filter(|t| t.is_required() && !self.contains(*t))
            .collect()
    }

    /// Source metadata recorded by the loader.
    pub fn source(&self, name: TableName) -> Option<&SourceMetadata> {
        self.sources.get(&name)
    }
}

/// Loads a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    parser: Parser,
}

impl DatasetLoader {
    /// Create a loader with default parser settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with custom parser settings.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            parser: Parser::with_config(config),
        }
    }

    /// Load the canonical tables from `data_dir` and any derived views present.
    ///
    /// Views are looked up in `views_dir` when given, otherwise in `data_dir`
    /// and then in the `generated` directory beside it.
    pub fn load_dir(
        &self,
        data_dir: impl AsRef<Path>,
        views_dir: Option<impl AsRef<Path>>,
    ) -> Result<Dataset> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(WardError::Io {
                path: data_dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "data directory not found",
                ),
            });
        }

        let view_dirs: Vec<PathBuf> = match views_dir {
            Some(dir) => vec![dir.as_ref().to_path_buf()],
            None => {
                let mut dirs = vec![data_dir.to_path_buf()];
                if let Some(parent) = data_dir.parent() {
                    dirs.push(parent.join(GENERATED_DIR));
                }
                dirs
            }
        };

        let mut dataset = Dataset::new();
        let mut missing = Vec::new();

        for table in TableName::ALL {
            let path = if table.is_required() {
                Some(data_dir.join(table.file_name())).filter(|p| p.is_file())
            } else {
                view_dirs
                    .iter()
                    .map(|dir| dir.join(table.file_name()))
                    .find(|p| p.is_file())
            };

            let Some(path) = path else {
                if table.is_required() {
                    missing.push(SchemaError::MissingTable(table));
                } else {
                    debug!(table = %table, "derived view not found, skipping");
                }
                continue;
            };

            let (data, source) = self.parser.parse_file(&path)?;
            info!(
                table = %table,
                rows = data.row_count(),
                columns = data.column_count(),
                "loaded {}",
                path.display()
            );
            dataset.insert(table, data);
            dataset.sources.insert(table, source);
        }

        if !missing.is_empty() {
            return Err(WardError::SchemaErrors(missing));
        }

        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> DataTable {
        DataTable::from_rows(&["patient_id"], &[vec!["P1".to_string()]])
    }

    #[test]
    fn test_insert_named_rejects_unknown() {
        let mut dataset = Dataset::new();
        assert!(dataset.insert_named("patients.csv", tiny()).is_ok());
        assert_eq!(
            dataset.insert_named("admissions", tiny()).err(),
            Some(SchemaError::UnknownTable("admissions".to_string()))
        );
        assert_eq!(dataset.table_names(), vec![TableName::Patients]);
    }

    #[test]
    fn test_iter_in_registry_order() {
        let dataset = Dataset::new()
            .with_table(TableName::Labs, tiny())
            .with_table(TableName::Patients, tiny());
        assert_eq!(
            dataset.table_names(),
            vec![TableName::Patients, TableName::Labs]
        );
        assert_eq!(dataset.missing_required(), vec![TableName::Vitals]);
    }

    #[test]
    fn test_load_dir_reports_missing_required() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("patients.csv"), "patient_id\nP1\n").unwrap();

        let err = DatasetLoader::new()
            .load_dir(dir.path(), None::<&Path>)
            .unwrap_err();
        match err {
            WardError::SchemaErrors(errors) => assert_eq!(
                errors,
                vec![
                    SchemaError::MissingTable(TableName::Vitals),
                    SchemaError::MissingTable(TableName::Labs),
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_dir_finds_generated_views() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("data");
        let generated = root.path().join("generated");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::create_dir_all(&generated).unwrap();
        for name in ["patients.csv", "vitals_timeseries.csv", "labs_timeseries.csv"] {
            std::fs::write(data.join(name), "patient_id\nP1\n").unwrap();
        }
        std::fs::write(
            generated.join("hospital_deterioration_ml_ready.csv"),
            "hour_from_admission\n0\n",
        )
        .unwrap();

        let dataset = DatasetLoader::new().load_dir(&data, None::<&Path>).unwrap();
        assert!(dataset.contains(TableName::MlReady));
        assert!(!dataset.contains(TableName::HourlyPanel));
        assert_eq!(
            dataset.source(TableName::Patients).unwrap().file,
            "patients.csv"
        );
    }
}
