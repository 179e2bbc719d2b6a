//! Fixed schema registry for the five dataset tables.
//!
//! Ranges follow the data dictionary, where they are approximate ("~"
//! prefixed), so range violations are reported as warnings.

use once_cell::sync::Lazy;

use crate::error::SchemaError;

use super::table::{TableName, TableSpec};
use super::types::ColumnSpec;

/// Joins every table to one hospital stay.
pub const PATIENT_ID: &str = "patient_id";
/// Zero-based hour index within a stay.
pub const HOUR: &str = "hour_from_admission";
/// Length of stay in hours, from `patients`.
pub const LOS_HOURS: &str = "los_hours";
/// Event hour, `-1` when the patient never deteriorates.
pub const DETERIORATION_HOUR: &str = "deterioration_hour";
pub const DETERIORATION_EVENT: &str = "deterioration_event";
pub const WITHIN_12H: &str = "deterioration_within_12h_from_admission";
/// Derived hourly label.
pub const NEXT_12H_LABEL: &str = "deterioration_next_12h";
pub const OXYGEN_DEVICE: &str = "oxygen_device";
pub const OXYGEN_FLOW: &str = "oxygen_flow";

/// Device value meaning no supplemental oxygen.
pub const NO_OXYGEN_DEVICE: &str = "none";

/// Oxygen devices known to the dataset.
pub const OXYGEN_DEVICES: [&str; 5] = ["none", "nasal", "mask", "hfnc", "niv"];

/// Patient-level columns the ML-ready view keeps.
const ML_STATIC_FEATURES: [&str; 4] = ["age", "gender", "comorbidity_index", "admission_type"];

static PATIENTS: Lazy<TableSpec> = Lazy::new(|| {
    TableSpec::new(
        TableName::Patients,
        vec![
            ColumnSpec::category(PATIENT_ID),
            ColumnSpec::integer("age").with_range(18.0, 90.0),
            ColumnSpec::category("gender").with_allowed(&["M", "F"]),
            ColumnSpec::integer("comorbidity_index").with_range(0.0, 8.0),
            ColumnSpec::category("admission_type").with_allowed(&["ED", "Elective", "Transfer"]),
            ColumnSpec::float("baseline_risk_score").with_range(0.0, 1.0),
            ColumnSpec::integer(LOS_HOURS).with_range(12.0, 72.0),
            ColumnSpec::binary(DETERIORATION_EVENT),
            ColumnSpec::binary(WITHIN_12H),
            ColumnSpec::integer(DETERIORATION_HOUR).with_range(-1.0, 71.0),
        ],
        &[PATIENT_ID],
    )
});

static VITALS: Lazy<TableSpec> = Lazy::new(|| {
    TableSpec::new(
        TableName::Vitals,
        vec![
            ColumnSpec::category(PATIENT_ID),
            ColumnSpec::integer(HOUR).with_range(0.0, 71.0),
            ColumnSpec::float("heart_rate").with_range(20.0, 250.0),
            ColumnSpec::float("respiratory_rate").with_range(4.0, 80.0),
            ColumnSpec::float("spo2_pct").with_range(0.0, 100.0),
            ColumnSpec::float("temperature_c").with_range(30.0, 45.0),
            ColumnSpec::float("systolic_bp").with_range(40.0, 250.0),
            ColumnSpec::float("diastolic_bp").with_range(20.0, 200.0),
            ColumnSpec::category(OXYGEN_DEVICE).with_allowed(&OXYGEN_DEVICES),
            ColumnSpec::float(OXYGEN_FLOW).with_min(0.0),
            ColumnSpec::integer("mobility_score").with_range(0.0, 4.0),
            ColumnSpec::binary("nurse_alert"),
        ],
        &[PATIENT_ID, HOUR],
    )
});

static LABS: Lazy<TableSpec> = Lazy::new(|| {
    TableSpec::new(
        TableName::Labs,
        vec![
            ColumnSpec::category(PATIENT_ID),
            ColumnSpec::integer(HOUR).with_range(0.0, 71.0),
            ColumnSpec::float("wbc_count").with_range(0.0, 100.0),
            ColumnSpec::float("lactate").with_range(0.0, 50.0),
            ColumnSpec::float("creatinine").with_range(0.0, 50.0),
            ColumnSpec::float("crp_level").with_range(0.0, 1000.0),
            ColumnSpec::float("hemoglobin").with_range(0.0, 30.0),
            ColumnSpec::float("sepsis_risk_score").with_range(0.0, 1.0),
        ],
        &[PATIENT_ID, HOUR],
    )
});

// vitals ⋈ labs on (patient_id, hour), then ⋈ patients on patient_id, plus the label.
static HOURLY_PANEL: Lazy<TableSpec> = Lazy::new(|| {
    let mut columns = VITALS.columns.clone();
    columns.extend(LABS.value_columns().cloned());
    columns.extend(PATIENTS.value_columns().cloned());
    columns.push(ColumnSpec::binary(NEXT_12H_LABEL));
    TableSpec::new(TableName::HourlyPanel, columns, &[PATIENT_ID, HOUR])
});

static ML_READY: Lazy<TableSpec> = Lazy::new(|| {
    let mut columns: Vec<ColumnSpec> = VITALS
        .columns
        .iter()
        .chain(LABS.value_columns())
        .filter(|c| c.name != PATIENT_ID)
        .cloned()
        .collect();
    columns.extend(
        PATIENTS
            .columns
            .iter()
            .filter(|c| ML_STATIC_FEATURES.contains(&c.name.as_str()))
            .cloned(),
    );
    columns.push(ColumnSpec::binary(NEXT_12H_LABEL));
    TableSpec::new(TableName::MlReady, columns, &[])
});

impl TableName {
    /// The registered specification for this table.
    pub fn spec(&self) -> &'static TableSpec {
        match self {
            TableName::Patients => &PATIENTS,
            TableName::Vitals => &VITALS,
            TableName::Labs => &LABS,
            TableName::HourlyPanel => &HOURLY_PANEL,
            TableName::MlReady => &ML_READY,
        }
    }
}

/// Look up a table specification by canonical name or file name.
pub fn get_table_spec(table_name: &str) -> Result<&'static TableSpec, SchemaError> {
    table_name.parse::<TableName>().map(|t| t.spec())
}

/// Patient-level columns (every `patients` column except the key).
pub fn patient_static_columns() -> impl Iterator<Item = &'static ColumnSpec> {
    PATIENTS.value_columns()
}
