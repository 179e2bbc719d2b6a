//! Shared helpers: synthetic datasets written as CSV files.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use wardcheck::schema::{HOUR, PATIENT_ID};
use wardcheck::validation::derive_label;
use wardcheck::{DataTable, Dataset, TableName};

/// Rows of every table, as text, before they hit the disk.
#[derive(Debug, Clone)]
pub struct Tables {
    tables: Vec<(TableName, Vec<String>, Vec<Vec<String>>)>,
}

impl Tables {
    /// Consistent tables for `(patient_id, los_hours, deterioration_hour)` triples,
    /// sorted by patient then hour.
    pub fn generate(patients: &[(&str, i64, i64)]) -> Self {
        let tables = TableName::ALL
            .into_iter()
            .map(|table| {
                let headers: Vec<String> =
                    table.spec().column_names().iter().map(|c| c.to_string()).collect();
                let mut rows = Vec::new();
                for (n, &(id, los, det)) in patients.iter().enumerate() {
                    let hours = if table == TableName::Patients { 0..1 } else { 0..los };
                    for hour in hours {
                        rows.push(
                            headers
                                .iter()
                                .map(|c| cell(c, id, n as i64, los, det, hour))
                                .collect(),
                        );
                    }
                }
                (table, headers, rows)
            })
            .collect();
        Self { tables }
    }

    fn find(&mut self, table: TableName) -> &mut (TableName, Vec<String>, Vec<Vec<String>>) {
        self.tables
            .iter_mut()
            .find(|(t, _, _)| *t == table)
            .expect("table present")
    }

    fn column(&mut self, table: TableName, column: &str) -> usize {
        self.find(table)
            .1
            .iter()
            .position(|h| h == column)
            .expect("column present")
    }

    /// Overwrite one cell.
    pub fn set(&mut self, table: TableName, row: usize, column: &str, value: &str) -> &mut Self {
        let idx = self.column(table, column);
        self.find(table).2[row][idx] = value.to_string();
        self
    }

    /// Row index of `(patient_id, hour)` in a time-series table.
    pub fn row_of(&mut self, table: TableName, patient_id: &str, hour: i64) -> usize {
        let pid = self.column(table, PATIENT_ID);
        let h = self.column(table, HOUR);
        let hour = hour.to_string();
        self.find(table)
            .2
            .iter()
            .position(|row| row[pid] == patient_id && row[h] == hour)
            .expect("row present")
    }

    /// Drop a patient's rows at the given hours from one table.
    pub fn drop_hours(&mut self, table: TableName, patient_id: &str, hours: &[i64]) -> &mut Self {
        let pid = self.column(table, PATIENT_ID);
        let h = self.column(table, HOUR);
        let hours: Vec<String> = hours.iter().map(|h| h.to_string()).collect();
        self.find(table)
            .2
            .retain(|row| !(row[pid] == patient_id && hours.contains(&row[h])));
        self
    }

    /// Drop a whole table.
    pub fn remove(&mut self, table: TableName) -> &mut Self {
        self.tables.retain(|(t, _, _)| *t != table);
        self
    }

    pub fn row_count(&self, table: TableName) -> usize {
        self.tables
            .iter()
            .find(|(t, _, _)| *t == table)
            .map_or(0, |(_, _, rows)| rows.len())
    }

    /// CSV text of one table.
    pub fn csv(&self, table: TableName) -> String {
        let (_, headers, rows) = self
            .tables
            .iter()
            .find(|(t, _, _)| *t == table)
            .expect("table present");
        let mut text = headers.join(",");
        text.push('\n');
        for row in rows {
            text.push_str(&row.join(","));
            text.push('\n');
        }
        text
    }

    /// Write the required tables to `data_dir` and the views to `views_dir`.
    pub fn write_split(&self, data_dir: &Path, views_dir: &Path) {
        fs::create_dir_all(data_dir).expect("create data dir");
        fs::create_dir_all(views_dir).expect("create views dir");
        for (table, _, _) in &self.tables {
            let dir = if table.is_required() { data_dir } else { views_dir };
            fs::write(dir.join(table.file_name()), self.csv(*table)).expect("write table");
        }
    }

    /// Write every table into one fresh directory.
    pub fn write_temp(&self) -> TempDir {
        let dir = TempDir::new().expect("create temp dir");
        self.write_split(dir.path(), dir.path());
        dir
    }

    /// The same tables, in memory.
    pub fn dataset(&self) -> Dataset {
        let mut dataset = Dataset::new();
        for (table, headers, rows) in &self.tables {
            dataset.insert(*table, DataTable::new(headers.clone(), rows.clone()));
        }
        dataset
    }
}

/// Plausible values that vary with patient and hour but stay in range.
fn cell(column: &str, id: &str, n: i64, los: i64, det: i64, hour: i64) -> String {
    match column {
        PATIENT_ID => id.to_string(),
        HOUR => hour.to_string(),
        "deterioration_next_12h" => u8::from(derive_label(hour, det)).to_string(),
        "los_hours" => los.to_string(),
        "deterioration_hour" => det.to_string(),
        "deterioration_event" => u8::from(det >= 0).to_string(),
        "deterioration_within_12h_from_admission" => u8::from((0..=12).contains(&det)).to_string(),
        "age" => (40 + n % 40).to_string(),
        "gender" => (if n % 2 == 0 { "F" } else { "M" }).to_string(),
        "comorbidity_index" => (n % 5).to_string(),
        "admission_type" => ["ED", "Elective", "Transfer"][(n % 3) as usize].to_string(),
        "baseline_risk_score" => format!("{:.2}", 0.1 + (n % 7) as f64 * 0.1),
        "heart_rate" => format!("{:.1}", 72.0 + (hour % 12) as f64),
        "respiratory_rate" => format!("{:.1}", 14.0 + (hour % 5) as f64),
        "spo2_pct" => format!("{:.1}", 95.0 + (hour % 4) as f64),
        "temperature_c" => format!("{:.1}", 36.6 + (hour % 3) as f64 * 0.2),
        "systolic_bp" => format!("{:.1}", 118.0 + (hour % 9) as f64),
        "diastolic_bp" => format!("{:.1}", 76.0 + (hour % 6) as f64),
        // Device on every third hour
        "oxygen_device" => (if hour % 3 == 2 { "nasal" } else { "none" }).to_string(),
        "oxygen_flow" => (if hour % 3 == 2 { "2.0" } else { "0.0" }).to_string(),
        "mobility_score" => (hour % 5).to_string(),
        "nurse_alert" => u8::from(hour % 7 == 6).to_string(),
        "wbc_count" => format!("{:.1}", 6.5 + (hour % 4) as f64 * 0.5),
        "lactate" => format!("{:.2}", 1.0 + (hour % 5) as f64 * 0.1),
        "creatinine" => format!("{:.2}", 0.8 + (n % 4) as f64 * 0.1),
        "crp_level" => format!("{:.1}", 4.0 + (hour % 10) as f64),
        "hemoglobin" => format!("{:.1}", 13.0 + (n % 3) as f64 * 0.4),
        "sepsis_risk_score" => format!("{:.3}", 0.05 + (hour % 6) as f64 * 0.01),
        other => panic!("no generated value for column {other}"),
    }
}
