//! Cross-table consistency rules.
//!
//! Each rule is a pure function of the dataset. Rules are independent of one
//! another, so the checker evaluates them in parallel and concatenates their
//! findings in registration order.

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::input::{DataTable, Dataset};
use crate::schema::{
    DETERIORATION_EVENT, DETERIORATION_HOUR, HOUR, LOS_HOURS, NEXT_12H_LABEL, NO_OXYGEN_DEVICE,
    OXYGEN_DEVICE, OXYGEN_DEVICES, OXYGEN_FLOW, PATIENT_ID, TableName, WITHIN_12H,
    patient_static_columns,
};

use super::patients::{PatientIndex, rows_by_patient, rows_by_patient_hour};
use super::violation::{RowRef, Rule, Violation};

/// Hours after `t` (inclusive) that count toward the next-12h label.
pub const LABEL_HORIZON_HOURS: i64 = 12;

/// Latest event hour that still counts as "within 12h from admission".
const EARLY_EVENT_MAX_HOUR: i64 = 12;

/// The hourly label: 1 iff `t < deterioration_hour <= t + 12`.
///
/// A `deterioration_hour` of `-1` (no event) never satisfies it.
pub fn derive_label(hour: i64, deterioration_hour: i64) -> bool {
    deterioration_hour >= 0
        && hour < deterioration_hour
        && deterioration_hour
            .checked_sub(hour)
            .is_some_and(|lead| lead <= LABEL_HORIZON_HOURS)
}

/// How rows of a derived view are tied back to patients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewJoin {
    /// The view carries its own `patient_id` column.
    PatientColumn,
    /// Row `i` of the view is row `i` of the hourly panel.
    PanelPosition,
    /// Neither is possible.
    Unjoinable(String),
}

/// Shared, read-only inputs for every rule.
pub struct CheckContext<'a> {
    pub dataset: &'a Dataset,
    pub patients: PatientIndex,
    ml_join: ViewJoin,
}

impl<'a> CheckContext<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let patients = dataset
            .get(TableName::Patients)
            .map(PatientIndex::build)
            .unwrap_or_default();
        let ml_join = resolve_ml_join(dataset);
        Self {
            dataset,
            patients,
            ml_join,
        }
    }

    pub fn table(&self, name: TableName) -> Option<&'a DataTable> {
        self.dataset.get(name)
    }

    /// How a view joins to patients. The panel always carries `patient_id`.
    pub fn view_join(&self, view: TableName) -> ViewJoin {
        match view {
            TableName::MlReady => self.ml_join.clone(),
            _ => ViewJoin::PatientColumn,
        }
    }

    /// Resolve every row of a view to `(row, patient_id, hour)`.
    ///
    /// Unjoinable views resolve to nothing.
    fn joined_rows(&self, view: TableName) -> Vec<JoinedRow<'a>> {
        let Some(table) = self.table(view) else {
            return Vec::new();
        };
        let hour_idx = table.column_index(HOUR);

        let (source, pid_idx) = match self.view_join(view) {
            ViewJoin::PatientColumn => (Some(table), table.column_index(PATIENT_ID)),
            ViewJoin::PanelPosition => {
                let panel = self.table(TableName::HourlyPanel);
                (panel, panel.and_then(|p| p.column_index(PATIENT_ID)))
            }
            ViewJoin::Unjoinable(_) => (None, None),
        };
        let (Some(source), Some(pid_idx)) = (source, pid_idx) else {
            return Vec::new();
        };

        (0..table.row_count())
            .filter_map(|row| {
                let patient_id = source.text(row, pid_idx)?;
                let hour = hour_idx.and_then(|h| table.integer(row, h));
                Some(JoinedRow {
                    row,
                    patient_id,
                    hour,
                })
            })
            .collect()
    }
}

struct JoinedRow<'a> {
    row: usize,
    patient_id: &'a str,
    hour: Option<i64>,
}

impl JoinedRow<'_> {
    fn row_ref(&self) -> RowRef {
        let mut key = vec![self.patient_id.to_string()];
        if let Some(hour) = self.hour {
            key.push(hour.to_string());
        }
        RowRef::at(self.row, key)
    }
}

fn resolve_ml_join(dataset: &Dataset) -> ViewJoin {
    let Some(ml) = dataset.get(TableName::MlReady) else {
        return ViewJoin::Unjoinable("view not present".to_string());
    };
    if ml.column_index(PATIENT_ID).is_some() {
        return ViewJoin::PatientColumn;
    }
    match dataset.get(TableName::HourlyPanel) {
        Some(panel) if panel.row_count() == ml.row_count() => ViewJoin::PanelPosition,
        Some(panel) => ViewJoin::Unjoinable(format!(
            "no patient_id column and row count {} differs from the hourly panel's {}",
            ml.row_count(),
            panel.row_count()
        )),
        None => ViewJoin::Unjoinable(
            "no patient_id column and no hourly panel to align with".to_string(),
        ),
    }
}

/// Key of a time-series row: `(patient_id, hour)` as written.
fn series_key(table: &DataTable, row: usize) -> Vec<String> {
    [PATIENT_ID, HOUR]
        .into_iter()
        .filter_map(|c| table.column_index(c))
        .map(|c| match table.integer(row, c) {
            Some(v) if table.headers[c] == HOUR => v.to_string(),
            _ => table.get(row, c).unwrap_or("").trim().to_string(),
        })
        .collect()
}

/// A cross-table rule.
pub trait ConsistencyRule: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Evaluate the rule.
    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation>;
}

/// Every non-patients table references known patients, and every known
/// patient appears in every time series.
pub struct ReferentialCoverage;

impl ConsistencyRule for ReferentialCoverage {
    fn name(&self) -> &'static str {
        "referential_coverage"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for name in TableName::ALL.into_iter().filter(|t| *t != TableName::Patients) {
            let Some(table) = ctx.table(name) else {
                continue;
            };
            if table.column_index(PATIENT_ID).is_none() {
                continue;
            }
            let groups = rows_by_patient(table);

            for (patient_id, rows) in &groups {
                if !ctx.patients.contains(patient_id) {
                    violations.push(
                        Violation::new(
                            name,
                            Rule::ReferentialCoverage,
                            format!(
                                "patient_id '{}' ({} rows) is not present in patients",
                                patient_id,
                                rows.len()
                            ),
                        )
                        .with_row(RowRef::at(rows[0], vec![patient_id.clone()]))
                        .with_column(PATIENT_ID),
                    );
                }
            }

            if name.is_time_series() {
                for (patient_id, _) in ctx.patients.iter() {
                    if !groups.contains_key(patient_id) {
                        violations.push(
                            Violation::new(
                                name,
                                Rule::ReferentialCoverage,
                                format!("patient '{}' has no rows in {}", patient_id, name),
                            )
                            .with_row(RowRef::patient(patient_id))
                            .with_column(PATIENT_ID),
                        );
                    }
                }
            }
        }

        violations
    }
}

/// Per patient: vitals rows == labs rows == `los_hours` (and the panel, when present).
pub struct RowCountEquality;

impl ConsistencyRule for RowCountEquality {
    fn name(&self) -> &'static str {
        "row_count_equality"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let (Some(vitals), Some(labs)) = (ctx.table(TableName::Vitals), ctx.table(TableName::Labs))
        else {
            return Vec::new();
        };
        let count = |groups: &IndexMap<String, Vec<usize>>, id: &str| {
            groups.get(id).map_or(0, Vec::len)
        };
        let vitals_groups = rows_by_patient(vitals);
        let labs_groups = rows_by_patient(labs);
        let panel_groups = ctx.table(TableName::HourlyPanel).map(rows_by_patient);

        let mut violations = Vec::new();
        for (patient_id, record) in ctx.patients.iter() {
            let Some(los) = record.los_hours else {
                continue;
            };
            let v = count(&vitals_groups, patient_id);
            let l = count(&labs_groups, patient_id);
            // Absence is reported by referential coverage
            if v == 0 || l == 0 {
                continue;
            }
            let p = panel_groups
                .as_ref()
                .map(|g| count(g, patient_id))
                .filter(|&p| p > 0);

            let expected = usize::try_from(los).ok();
            let agrees = |n: usize| Some(n) == expected;
            if agrees(v) && agrees(l) && p.is_none_or(agrees) {
                continue;
            }

            let mut message = format!(
                "row counts disagree: {} has {}, {} has {}",
                TableName::Vitals,
                v,
                TableName::Labs,
                l
            );
            if let Some(p) = p {
                message.push_str(&format!(", {} has {}", TableName::HourlyPanel, p));
            }
            message.push_str(&format!(", los_hours is {}", los));

            violations.push(
                Violation::new(TableName::Patients, Rule::RowCountMismatch, message)
                    .with_row(RowRef::at(record.row, vec![patient_id.to_string()]))
                    .with_column(LOS_HOURS),
            );
        }

        violations
    }
}

/// `oxygen_device == "none"` iff `oxygen_flow == 0.0`.
pub struct OxygenLinkage;

impl ConsistencyRule for OxygenLinkage {
    fn name(&self) -> &'static str {
        "oxygen_linkage"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(vitals) = ctx.table(TableName::Vitals) else {
            return Vec::new();
        };
        let (Some(device_idx), Some(flow_idx)) = (
            vitals.column_index(OXYGEN_DEVICE),
            vitals.column_index(OXYGEN_FLOW),
        ) else {
            return Vec::new();
        };

        let mut violations = Vec::new();
        for row in 0..vitals.row_count() {
            let (Some(device), Some(flow)) =
                (vitals.text(row, device_idx), vitals.float(row, flow_idx))
            else {
                continue;
            };
            // Unknown devices are category errors already
            if !OXYGEN_DEVICES.contains(&device) {
                continue;
            }

            let message = if device == NO_OXYGEN_DEVICE && flow != 0.0 {
                format!(
                    "oxygen_flow {} must be 0.0 when oxygen_device is '{}'",
                    flow, NO_OXYGEN_DEVICE
                )
            } else if device != NO_OXYGEN_DEVICE && flow <= 0.0 {
                format!(
                    "oxygen_flow {} must be > 0 when oxygen_device is '{}'",
                    flow, device
                )
            } else {
                continue;
            };

            violations.push(
                Violation::new(TableName::Vitals, Rule::OxygenLinkage, message)
                    .with_row(RowRef::at(row, series_key(vitals, row)))
                    .with_column(OXYGEN_FLOW),
            );
        }

        violations
    }
}

/// `deterioration_next_12h` in the derived views matches [`derive_label`].
pub struct LabelDerivation;

impl ConsistencyRule for LabelDerivation {
    fn name(&self) -> &'static str {
        "label_derivation"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();

        for view in [TableName::HourlyPanel, TableName::MlReady] {
            let Some(table) = ctx.table(view) else {
                continue;
            };
            let Some(label_idx) = table.column_index(NEXT_12H_LABEL) else {
                continue;
            };

            for joined in ctx.joined_rows(view) {
                let Some(hour) = joined.hour else {
                    continue;
                };
                let Some(event_hour) = ctx
                    .patients
                    .get(joined.patient_id)
                    .and_then(|r| r.deterioration_hour)
                else {
                    continue;
                };
                let Some(label) = table.flag(joined.row, label_idx) else {
                    continue;
                };

                let expected = derive_label(hour, event_hour);
                if label != expected {
                    violations.push(
                        Violation::new(
                            view,
                            Rule::LabelDerivation,
                            format!(
                                "deterioration_next_12h is {} but must be {} (hour {}, deterioration_hour {})",
                                u8::from(label),
                                u8::from(expected),
                                hour,
                                event_hour
                            ),
                        )
                        .with_row(joined.row_ref())
                        .with_column(NEXT_12H_LABEL),
                    );
                }
            }
        }

        violations
    }
}

/// Patient-level columns copied into the views equal their `patients` source.
pub struct StaticFeatureAgreement;

impl ConsistencyRule for StaticFeatureAgreement {
    fn name(&self) -> &'static str {
        "static_feature_agreement"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(patients) = ctx.table(TableName::Patients) else {
            return Vec::new();
        };
        let mut violations = Vec::new();

        for view in [TableName::HourlyPanel, TableName::MlReady] {
            let Some(table) = ctx.table(view) else {
                continue;
            };
            // (spec, view column, patients column)
            let columns: Vec<_> = patient_static_columns()
                .filter(|c| view.spec().declares(&c.name))
                .filter_map(|c| {
                    Some((c, table.column_index(&c.name)?, patients.column_index(&c.name)?))
                })
                .collect();
            if columns.is_empty() {
                continue;
            }

            for joined in ctx.joined_rows(view) {
                let Some(record) = ctx.patients.get(joined.patient_id) else {
                    continue;
                };
                for &(spec, view_idx, source_idx) in &columns {
                    let (Some(actual), Some(source)) = (
                        table.text(joined.row, view_idx),
                        patients.text(record.row, source_idx),
                    ) else {
                        continue;
                    };
                    if !spec.same_value(actual, source) {
                        violations.push(
                            Violation::new(
                                view,
                                Rule::StaticFeatureMismatch,
                                format!(
                                    "{} is '{}' but patients has '{}' for patient '{}'",
                                    spec.name, actual, source, joined.patient_id
                                ),
                            )
                            .with_row(joined.row_ref())
                            .with_column(spec.name.clone()),
                        );
                    }
                }
            }
        }

        violations
    }
}

/// Hourly columns in the views equal their source rows: panel against vitals
/// and labs, ML-ready view against the panel.
pub struct SeriesFeatureAgreement;

impl SeriesFeatureAgreement {
    fn check_panel(&self, ctx: &CheckContext<'_>, violations: &mut Vec<Violation>) {
        let Some(panel) = ctx.table(TableName::HourlyPanel) else {
            return;
        };
        let (Some(pid_idx), Some(hour_idx)) =
            (panel.column_index(PATIENT_ID), panel.column_index(HOUR))
        else {
            return;
        };

        for source_name in [TableName::Vitals, TableName::Labs] {
            let Some(source) = ctx.table(source_name) else {
                continue;
            };
            let source_keys = rows_by_patient_hour(source);
            let columns: Vec<_> = source_name
                .spec()
                .value_columns()
                .filter_map(|c| {
                    Some((c, panel.column_index(&c.name)?, source.column_index(&c.name)?))
                })
                .collect();

            for row in 0..panel.row_count() {
                let (Some(patient_id), Some(hour)) =
                    (panel.text(row, pid_idx), panel.integer(row, hour_idx))
                else {
                    continue;
                };
                let key = vec![patient_id.to_string(), hour.to_string()];
                let Some(&source_row) = source_keys.get(&(patient_id.to_string(), hour)) else {
                    violations.push(
                        Violation::new(
                            TableName::HourlyPanel,
                            Rule::SeriesFeatureMismatch,
                            format!(
                                "no {} row for patient '{}' hour {}",
                                source_name, patient_id, hour
                            ),
                        )
                        .with_row(RowRef::at(row, key)),
                    );
                    continue;
                };

                for &(spec, panel_idx, source_idx) in &columns {
                    let actual = panel.get(row, panel_idx).unwrap_or("");
                    let expected = source.get(source_row, source_idx).unwrap_or("");
                    if !spec.same_value(actual, expected) {
                        violations.push(
                            Violation::new(
                                TableName::HourlyPanel,
                                Rule::SeriesFeatureMismatch,
                                format!(
                                    "{} is '{}' but {} has '{}'",
                                    spec.name,
                                    actual.trim(),
                                    source_name,
                                    expected.trim()
                                ),
                            )
                            .with_row(RowRef::at(row, key.clone()))
                            .with_column(spec.name.clone()),
                        );
                    }
                }
            }
        }
    }

    fn check_ml_ready(&self, ctx: &CheckContext<'_>, violations: &mut Vec<Violation>) {
        let (Some(ml), Some(panel)) = (
            ctx.table(TableName::MlReady),
            ctx.table(TableName::HourlyPanel),
        ) else {
            return;
        };
        let join = ctx.view_join(TableName::MlReady);
        if matches!(join, ViewJoin::Unjoinable(_)) {
            return;
        }

        let static_names: Vec<&str> = patient_static_columns().map(|c| c.name.as_str()).collect();
        let columns: Vec<_> = TableName::MlReady
            .spec()
            .columns
            .iter()
            .filter(|c| c.name != NEXT_12H_LABEL && !static_names.contains(&c.name.as_str()))
            .filter_map(|c| Some((c, ml.column_index(&c.name)?, panel.column_index(&c.name)?)))
            .collect();
        let panel_keys = match join {
            ViewJoin::PatientColumn => Some(rows_by_patient_hour(panel)),
            _ => None,
        };

        for joined in ctx.joined_rows(TableName::MlReady) {
            let panel_row = match &panel_keys {
                None => Some(joined.row),
                Some(keys) => joined
                    .hour
                    .and_then(|h| keys.get(&(joined.patient_id.to_string(), h)).copied()),
            };
            let Some(panel_row) = panel_row else {
                violations.push(
                    Violation::new(
                        TableName::MlReady,
                        Rule::SeriesFeatureMismatch,
                        format!(
                            "no {} row for patient '{}'",
                            TableName::HourlyPanel,
                            joined.patient_id
                        ),
                    )
                    .with_row(joined.row_ref()),
                );
                continue;
            };

            for &(spec, ml_idx, panel_idx) in &columns {
                let actual = ml.get(joined.row, ml_idx).unwrap_or("");
                let expected = panel.get(panel_row, panel_idx).unwrap_or("");
                if !spec.same_value(actual, expected) {
                    violations.push(
                        Violation::new(
                            TableName::MlReady,
                            Rule::SeriesFeatureMismatch,
                            format!(
                                "{} is '{}' but {} row {} has '{}'",
                                spec.name,
                                actual.trim(),
                                TableName::HourlyPanel,
                                panel_row + 1,
                                expected.trim()
                            ),
                        )
                        .with_row(joined.row_ref())
                        .with_column(spec.name.clone()),
                    );
                }
            }
        }
    }
}

impl ConsistencyRule for SeriesFeatureAgreement {
    fn name(&self) -> &'static str {
        "series_feature_agreement"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.check_panel(ctx, &mut violations);
        self.check_ml_ready(ctx, &mut violations);
        violations
    }
}

/// Outcome columns in `patients` agree with each other.
pub struct OutcomeCoherence;

impl ConsistencyRule for OutcomeCoherence {
    fn name(&self) -> &'static str {
        "outcome_coherence"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(patients) = ctx.table(TableName::Patients) else {
            return Vec::new();
        };
        let (Some(pid_idx), Some(event_idx), Some(within_idx), Some(hour_idx), Some(los_idx)) = (
            patients.column_index(PATIENT_ID),
            patients.column_index(DETERIORATION_EVENT),
            patients.column_index(WITHIN_12H),
            patients.column_index(DETERIORATION_HOUR),
            patients.column_index(LOS_HOURS),
        ) else {
            return Vec::new();
        };

        let mut violations = Vec::new();
        for row in 0..patients.row_count() {
            let event = patients.flag(row, event_idx);
            let within = patients.flag(row, within_idx);
            let hour = patients.integer(row, hour_idx);
            let los = patients.integer(row, los_idx);
            let early = hour.is_some_and(|h| (0..=EARLY_EVENT_MAX_HOUR).contains(&h));

            let mut findings: Vec<(&str, String)> = Vec::new();
            match (event, hour) {
                (Some(false), Some(h)) if h != -1 => findings.push((
                    DETERIORATION_HOUR,
                    format!(
                        "deterioration_hour must be -1 when deterioration_event is 0 (found {})",
                        h
                    ),
                )),
                (Some(true), Some(h)) if los.is_some_and(|los| h < 0 || h >= los) => {
                    findings.push((
                        DETERIORATION_HOUR,
                        format!(
                            "deterioration_hour {} must lie in [0, los_hours) when deterioration_event is 1",
                            h
                        ),
                    ))
                }
                _ => {}
            }
            if within == Some(true) {
                if event == Some(false) {
                    findings.push((
                        WITHIN_12H,
                        "within-12h flag is 1 but deterioration_event is 0".to_string(),
                    ));
                } else if event == Some(true) && hour.is_some() && !early {
                    findings.push((
                        WITHIN_12H,
                        format!(
                            "within-12h flag is 1 but deterioration_hour {} is outside [0, {}]",
                            hour.unwrap_or_default(),
                            EARLY_EVENT_MAX_HOUR
                        ),
                    ));
                }
            }
            if event == Some(true) && early && within == Some(false) {
                findings.push((
                    WITHIN_12H,
                    format!(
                        "deterioration_hour {} is within the first {}h but within-12h flag is 0",
                        hour.unwrap_or_default(),
                        EARLY_EVENT_MAX_HOUR
                    ),
                ));
            }

            let key = patients.text(row, pid_idx).unwrap_or("").to_string();
            for (column, message) in findings {
                violations.push(
                    Violation::new(TableName::Patients, Rule::OutcomeCoherence, message)
                        .with_row(RowRef::at(row, vec![key.clone()]))
                        .with_column(column),
                );
            }
        }

        violations
    }
}

/// One warning when the ML-ready view cannot be tied back to patients.
pub struct ViewJoinability;

impl ConsistencyRule for ViewJoinability {
    fn name(&self) -> &'static str {
        "view_joinability"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        if !ctx.dataset.contains(TableName::MlReady) {
            return Vec::new();
        }
        match ctx.view_join(TableName::MlReady) {
            ViewJoin::Unjoinable(reason) => {
                warn!(table = %TableName::MlReady, "{}", reason);
                vec![Violation::new(
                    TableName::MlReady,
                    Rule::UnjoinableView,
                    format!("{}; label and feature checks skipped", reason),
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// Runs every cross-table rule.
pub struct ConsistencyChecker {
    rules: Vec<Box<dyn ConsistencyRule>>,
}

impl ConsistencyChecker {
    /// Create a checker with all default rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ReferentialCoverage),
                Box::new(RowCountEquality),
                Box::new(OxygenLinkage),
                Box::new(LabelDerivation),
                Box::new(StaticFeatureAgreement),
                Box::new(SeriesFeatureAgreement),
                Box::new(OutcomeCoherence),
                Box::new(ViewJoinability),
            ],
        }
    }

    /// Create a checker with a custom rule set.
    pub fn with_rules(rules: Vec<Box<dyn ConsistencyRule>>) -> Self {
        Self { rules }
    }

    /// Evaluate all rules and collect violations in rule order.
    pub fn check(&self, dataset: &Dataset) -> Vec<Violation> {
        let ctx = CheckContext::new(dataset);
        self.check_with(&ctx)
    }

    pub fn check_with(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let per_rule: Vec<Vec<Violation>> = self
            .rules
            .par_iter()
            .map(|rule| {
                let violations = rule.check(ctx);
                debug!(rule = rule.name(), violations = violations.len(), "rule evaluated");
                violations
            })
            .collect();

        per_rule.into_iter().flatten().collect()
    }
}

impl Default for ConsistencyChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate every cross-table rule over `dataset`.
pub fn check_consistency(dataset: &Dataset) -> Vec<Violation> {
    ConsistencyChecker::new().check(dataset)
}
