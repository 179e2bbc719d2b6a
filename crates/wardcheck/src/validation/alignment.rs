//! Temporal alignment: every time series covers each patient's hours
//! `0..los_hours` exactly once.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::debug;

use crate::input::{DataTable, Dataset};
use crate::schema::{HOUR, PATIENT_ID, TableName};

use super::patients::{PatientIndex, rows_by_patient};
use super::violation::{RowRef, Rule, Violation};

/// Checks hour coverage of the time-series tables.
#[derive(Debug, Clone, Default)]
pub struct AlignmentChecker;

impl AlignmentChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check every time-series table present in `dataset`.
    pub fn check(&self, dataset: &Dataset) -> Vec<Violation> {
        let patients = dataset
            .get(TableName::Patients)
            .map(PatientIndex::build)
            .unwrap_or_default();
        self.check_with(dataset, &patients)
    }

    /// Like [`check`](Self::check) with a prebuilt patient index.
    pub fn check_with(&self, dataset: &Dataset, patients: &PatientIndex) -> Vec<Violation> {
        let tables: Vec<(TableName, &DataTable)> = dataset
            .iter()
            .filter(|(name, _)| name.is_time_series())
            .collect();

        let per_table: Vec<Vec<Violation>> = tables
            .par_iter()
            .map(|&(name, table)| self.check_table(name, table, patients))
            .collect();

        per_table.into_iter().flatten().collect()
    }

    /// Check one table. Per patient, out-of-range and repeated hours come
    /// first in row order, then gaps in ascending order.
    ///
    /// Patients missing from the index, or without a parseable `los_hours`,
    /// are skipped; referential coverage and row validation report them.
    pub fn check_table(
        &self,
        name: TableName,
        table: &DataTable,
        patients: &PatientIndex,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        let (Some(pid_idx), Some(hour_idx)) =
            (table.column_index(PATIENT_ID), table.column_index(HOUR))
        else {
            return violations;
        };
        let groups = rows_by_patient(table);

        for (patient_id, record) in patients.iter() {
            let Some(los) = record.los_hours else {
                continue;
            };
            // A non-positive stay expects no hours at all
            let expected = 0..los.max(0);
            let Some(rows) = groups.get(patient_id) else {
                if !expected.is_empty() {
                    violations.push(
                        Violation::new(
                            name,
                            Rule::MissingHour,
                            format!("no rows; expected {}", hour_span(0, los - 1)),
                        )
                        .with_row(RowRef::patient(patient_id))
                        .with_column(HOUR),
                    );
                }
                continue;
            };

            let mut seen = BTreeSet::new();
            for &row in rows {
                let Some(hour) = table.integer(row, hour_idx) else {
                    continue;
                };
                let key = vec![
                    table.text(row, pid_idx).unwrap_or(patient_id).to_string(),
                    hour.to_string(),
                ];

                if !expected.contains(&hour) {
                    let message =
                        format!("hour {} outside 0..{} (los_hours {})", hour, expected.end, los);
                    violations.push(
                        Violation::new(name, Rule::ExtraHour, message)
                            .with_row(RowRef::at(row, key))
                            .with_column(HOUR),
                    );
                } else if !seen.insert(hour) {
                    let message = format!(
                        "hour {} appears more than once for patient '{}'",
                        hour, patient_id
                    );
                    violations.push(
                        Violation::new(name, Rule::DuplicateHour, message)
                            .with_row(RowRef::at(row, key))
                            .with_column(HOUR),
                    );
                }
            }

            for (start, end) in gaps(&seen, expected.end) {
                violations.push(
                    Violation::new(
                        name,
                        Rule::MissingHour,
                        format!("missing {} of 0..{}", hour_span(start, end), los),
                    )
                    .with_row(RowRef::patient(patient_id))
                    .with_column(HOUR),
                );
            }
        }

        debug!(
            table = %name,
            patients = patients.len(),
            violations = violations.len(),
            "alignment check complete"
        );

        violations
    }
}

/// Check one time-series table against `patients`.
pub fn check_alignment(name: TableName, table: &DataTable, patients: &DataTable) -> Vec<Violation> {
    AlignmentChecker::new().check_table(name, table, &PatientIndex::build(patients))
}

/// Contiguous runs of `0..end` missing from `seen` as inclusive
/// `(start, end)` pairs. `seen` holds only hours inside the range.
fn gaps(seen: &BTreeSet<i64>, end: i64) -> Vec<(i64, i64)> {
    let mut runs = Vec::new();
    let mut next = 0;
    for &hour in seen {
        if hour > next {
            runs.push((next, hour - 1));
        }
        next = hour + 1;
    }
    if next < end {
        runs.push((next, end - 1));
    }
    runs
}

fn hour_span(start: i64, end: i64) -> String {
    if start == end {
        format!("hour {}", start)
    } else {
        format!("hours {}..={}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::schema::LOS_HOURS;

    fn vitals_violations(dataset: &Dataset) -> Vec<Violation> {
        check_alignment(
            TableName::Vitals,
            dataset.get(TableName::Vitals).unwrap(),
            dataset.get(TableName::Patients).unwrap(),
        )
    }

    #[test]
    fn test_gaps() {
        let seen = |hours: &[i64]| hours.iter().copied().collect::<BTreeSet<i64>>();
        assert!(gaps(&seen(&[0, 1, 2]), 3).is_empty());
        assert_eq!(gaps(&seen(&[1]), 4), vec![(0, 0), (2, 3)]);
        assert_eq!(gaps(&seen(&[]), 2), vec![(0, 1)]);
        assert!(gaps(&seen(&[]), 0).is_empty());
    }

    #[test]
    fn test_aligned_dataset() {
        let dataset = fixtures::dataset(&[("P1", 12, -1), ("P2", 30, 20)]);
        assert!(AlignmentChecker::new().check(&dataset).is_empty());
    }

    #[test]
    fn test_missing_hours_grouped_into_ranges() {
        let mut dataset = fixtures::dataset(&[("P1", 20, -1)]);
        fixtures::drop_rows(&mut dataset, TableName::Vitals, "P1", &[3, 4, 5, 11]);

        let violations = vitals_violations(&dataset);
        let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["missing hours 3..=5 of 0..20", "missing hour 11 of 0..20"]
        );
        assert!(violations.iter().all(|v| v.rule == Rule::MissingHour));
        assert_eq!(violations[0].row, Some(RowRef::patient("P1")));
    }

    #[test]
    fn test_extra_and_duplicate_hours() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Vitals, 11, HOUR, "12");
        fixtures::set(&mut dataset, TableName::Vitals, 4, HOUR, "3");

        let violations = vitals_violations(&dataset);
        let found: Vec<(Rule, Option<usize>)> = violations
            .iter()
            .map(|v| (v.rule, v.row.as_ref().and_then(|r| r.index)))
            .collect();
        assert_eq!(
            found,
            vec![
                (Rule::DuplicateHour, Some(4)),
                (Rule::ExtraHour, Some(11)),
                (Rule::MissingHour, None),
                (Rule::MissingHour, None),
            ]
        );
        assert_eq!(violations[2].message, "missing hour 4 of 0..12");
        assert_eq!(violations[3].message, "missing hour 11 of 0..12");
    }

    #[test]
    fn test_absent_patient_is_one_violation() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1), ("P2", 14, -1)]);
        let hours: Vec<i64> = (0..14).collect();
        fixtures::drop_rows(&mut dataset, TableName::Vitals, "P2", &hours);

        let violations = vitals_violations(&dataset);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "no rows; expected hours 0..=13");
    }

    #[test]
    fn test_unknown_patients_are_skipped() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Vitals, 11, PATIENT_ID, "P9");

        let violations = vitals_violations(&dataset);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "missing hour 11 of 0..12");
    }

    #[test]
    fn test_checks_every_time_series() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::drop_rows(&mut dataset, TableName::Labs, "P1", &[0]);
        fixtures::drop_rows(&mut dataset, TableName::HourlyPanel, "P1", &[1]);

        let tables: Vec<TableName> = AlignmentChecker::new()
            .check(&dataset)
            .iter()
            .map(|v| v.table)
            .collect();
        assert_eq!(tables, vec![TableName::Labs, TableName::HourlyPanel]);
    }

    #[test]
    fn test_huge_stay_reports_one_gap() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Patients, 0, LOS_HOURS, "100000000000000");

        let violations = vitals_violations(&dataset);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::MissingHour);
        assert_eq!(
            violations[0].message,
            "missing hours 12..=99999999999999 of 0..100000000000000"
        );
    }

    #[test]
    fn test_non_positive_stay_makes_every_row_extra() {
        for los in ["0", "-3"] {
            let mut dataset = fixtures::dataset(&[("P1", 12, -1)]);
            fixtures::set(&mut dataset, TableName::Patients, 0, LOS_HOURS, los);

            let violations = vitals_violations(&dataset);
            assert_eq!(violations.len(), 12);
            assert!(violations.iter().all(|v| v.rule == Rule::ExtraHour));
            let expected = format!("hour 0 outside 0..0 (los_hours {})", los);
            assert_eq!(violations[0].message, expected);
        }
    }

    #[test]
    fn test_absent_patient_with_empty_stay_is_silent() {
        let mut dataset = fixtures::dataset(&[("P1", 12, -1), ("P2", 12, -1)]);
        fixtures::set(&mut dataset, TableName::Patients, 1, LOS_HOURS, "0");
        let hours: Vec<i64> = (0..12).collect();
        fixtures::drop_rows(&mut dataset, TableName::Vitals, "P2", &hours);

        assert!(vitals_violations(&dataset).is_empty());
    }
}
