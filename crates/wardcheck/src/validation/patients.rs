//! Patient lookup shared by the cross-table and alignment checks.

use indexmap::IndexMap;

use crate::input::DataTable;
use crate::schema::{DETERIORATION_HOUR, HOUR, LOS_HOURS, PATIENT_ID};

/// One patient's row in `patients`, with the values the checks join on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientRecord {
    /// Row index in `patients`.
    pub row: usize,
    pub los_hours: Option<i64>,
    pub deterioration_hour: Option<i64>,
}

/// Patients by id, in file order. Duplicate ids keep their first row.
#[derive(Debug, Clone, Default)]
pub struct PatientIndex {
    records: IndexMap<String, PatientRecord>,
}

impl PatientIndex {
    /// Index the `patients` table.
    pub fn build(patients: &DataTable) -> Self {
        let mut records = IndexMap::new();
        let Some(pid) = patients.column_index(PATIENT_ID) else {
            return Self { records };
        };
        let los = patients.column_index(LOS_HOURS);
        let det = patients.column_index(DETERIORATION_HOUR);

        for row in 0..patients.row_count() {
            let Some(id) = patients.text(row, pid) else {
                continue;
            };
            records.entry(id.to_string()).or_insert(PatientRecord {
                row,
                los_hours: los.and_then(|c| patients.integer(row, c)),
                deterioration_hour: det.and_then(|c| patients.integer(row, c)),
            });
        }

        Self { records }
    }

    pub fn get(&self, patient_id: &str) -> Option<&PatientRecord> {
        self.records.get(patient_id)
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.records.contains_key(patient_id)
    }

    /// Patients in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatientRecord)> {
        self.records.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Row indices of a table grouped by patient id, in first-occurrence order.
///
/// Rows with a missing patient id are skipped.
pub fn rows_by_patient(table: &DataTable) -> IndexMap<String, Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    let Some(pid) = table.column_index(PATIENT_ID) else {
        return groups;
    };
    for row in 0..table.row_count() {
        if let Some(id) = table.text(row, pid) {
            groups.entry(id.to_string()).or_default().push(row);
        }
    }
    groups
}

/// Map `(patient_id, hour)` to the first row carrying it.
pub fn rows_by_patient_hour(table: &DataTable) -> IndexMap<(String, i64), usize> {
    let mut keys = IndexMap::new();
    let (Some(pid), Some(hour)) = (table.column_index(PATIENT_ID), table.column_index(HOUR)) else {
        return keys;
    };
    for row in 0..table.row_count() {
        if let (Some(id), Some(h)) = (table.text(row, pid), table.integer(row, hour)) {
            keys.entry((id.to_string(), h)).or_insert(row);
        }
    }
    keys
}
