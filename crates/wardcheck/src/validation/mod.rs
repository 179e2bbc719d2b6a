//! Validation stages: per-table rows, cross-table consistency and temporal
//! alignment.

mod alignment;
mod consistency;
mod patients;
mod rows;
mod violation;

pub use alignment::{AlignmentChecker, check_alignment};
pub use consistency::{
    CheckContext, ConsistencyChecker, ConsistencyRule, LABEL_HORIZON_HOURS, LabelDerivation,
    OutcomeCoherence, OxygenLinkage, ReferentialCoverage, RowCountEquality,
    SeriesFeatureAgreement, StaticFeatureAgreement, ViewJoin, ViewJoinability, check_consistency,
    derive_label,
};
pub use patients::{PatientIndex, PatientRecord, rows_by_patient, rows_by_patient_hour};
pub use rows::{RowValidator, UnknownColumnPolicy, validate_rows};
pub use violation::{RowRef, Rule, Severity, Violation};
