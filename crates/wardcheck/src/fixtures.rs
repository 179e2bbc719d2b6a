//! Consistent synthetic datasets for unit tests.

use crate::input::{DataTable, Dataset};
use crate::schema::{HOUR, NEXT_12H_LABEL, PATIENT_ID, TableName};
use crate::validation::derive_label;

/// Build all five tables for `(patient_id, los_hours, deterioration_hour)` triples.
///
/// Every generated table passes validation unchanged. Rows are sorted by
/// patient then hour, so for a single patient row `i` is hour `i`.
pub fn dataset(patients: &[(&str, i64, i64)]) -> Dataset {
    let mut dataset = Dataset::new();
    for table in TableName::ALL {
        let spec = table.spec();
        let mut rows = Vec::new();
        for &(id, los, det) in patients {
            if table == TableName::Patients {
                rows.push(spec.column_names().iter().map(|c| cell(c, id, los, det, 0)).collect());
                continue;
            }
            for hour in 0..los {
                rows.push(
                    spec.column_names()
                        .iter()
                        .map(|c| cell(c, id, los, det, hour))
                        .collect(),
                );
            }
        }
        dataset.insert(table, DataTable::from_rows(&spec.column_names(), &rows));
    }
    dataset
}

fn cell(column: &str, id: &str, los: i64, det: i64, hour: i64) -> String {
    let value = match column {
        PATIENT_ID => return id.to_string(),
        HOUR => return hour.to_string(),
        NEXT_12H_LABEL => return u8::from(derive_label(hour, det)).to_string(),
        "los_hours" => return los.to_string(),
        "deterioration_hour" => return det.to_string(),
        "deterioration_event" => return u8::from(det >= 0).to_string(),
        "deterioration_within_12h_from_admission" => {
            return u8::from((0..=12).contains(&det)).to_string();
        }
        "age" => "54",
        "gender" => "F",
        "comorbidity_index" => "2",
        "admission_type" => "ED",
        "baseline_risk_score" => "0.25",
        "heart_rate" => "82.0",
        "respiratory_rate" => "16.0",
        "spo2_pct" => "97.0",
        "temperature_c" => "37.1",
        "systolic_bp" => "121.0",
        "diastolic_bp" => "78.0",
        "oxygen_device" => "none",
        "oxygen_flow" => "0.0",
        "mobility_score" => "3",
        "nurse_alert" => "0",
        "wbc_count" => "7.4",
        "lactate" => "1.1",
        "creatinine" => "0.9",
        "crp_level" => "5.2",
        "hemoglobin" => "13.6",
        "sepsis_risk_score" => "0.08",
        other => panic!("no fixture value for column {other}"),
    };
    value.to_string()
}

/// Overwrite one cell.
pub fn set(dataset: &mut Dataset, table: TableName, row: usize, column: &str, value: &str) {
    let t = dataset.get_mut(table).expect("table present");
    let idx = t.column_index(column).expect("column present");
    t.rows[row][idx] = value.to_string();
}

/// Row index of `(patient_id, hour)` in a time-series table.
pub fn row_of(dataset: &Dataset, table: TableName, patient_id: &str, hour: i64) -> usize {
    let t = dataset.get(table).expect("table present");
    let pid = t.column_index(PATIENT_ID).expect("patient_id");
    let h = t.column_index(HOUR).expect("hour");
    (0..t.row_count())
        .find(|&r| t.get(r, pid) == Some(patient_id) && t.integer(r, h) == Some(hour))
        .expect("row present")
}

/// Drop rows matching a predicate on `(patient_id, hour)`.
pub fn drop_rows(dataset: &mut Dataset, table: TableName, patient_id: &str, hours: &[i64]) {
    let t = dataset.get_mut(table).expect("table present");
    let pid = t.column_index(PATIENT_ID).expect("patient_id");
    let h = t.column_index(HOUR).expect("hour");
    t.rows.retain(|row| {
        let hour: i64 = row[h].parse().expect("integer hour");
        !(row[pid] == patient_id && hours.contains(&hour))
    });
}
