//! Severity aggregation and the final report.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::TableName;
use crate::validation::{Rule, Severity, Violation};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

/// Counts of violations by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl ViolationCounts {
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }

    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
    }
}

/// Result of validating a dataset.
///
/// Contains no timestamps or paths, so identical inputs serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub verdict: Verdict,
    /// Whether warnings counted toward the verdict.
    pub strict: bool,
    pub counts: ViolationCounts,
    /// Ordered by table, then rule, then first occurrence.
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Process exit code for this report: 0 on pass, 1 on fail.
    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }

    /// Violation counts per table and rule, in report order.
    pub fn breakdown(&self) -> IndexMap<TableName, IndexMap<Rule, ViolationCounts>> {
        let mut breakdown: IndexMap<TableName, IndexMap<Rule, ViolationCounts>> = IndexMap::new();
        for v in &self.violations {
            breakdown
                .entry(v.table)
                .or_default()
                .entry(v.rule)
                .or_default()
                .add(v.severity);
        }
        breakdown
    }

    /// Violations of one table.
    pub fn for_table(&self, table: TableName) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.table == table)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Aggregate violations into a report.
///
/// Severities are left as detected. Without `strict` only errors fail the
/// run; with it any violation does.
pub fn classify_and_report(mut violations: Vec<Violation>, strict: bool) -> Report {
    // Stable: first occurrence order survives within a (table, rule) group
    violations.sort_by_key(|v| (v.table, v.rule));

    let mut counts = ViolationCounts::default();
    for v in &violations {
        counts.add(v.severity);
    }

    let failed = counts.errors > 0 || (strict && counts.warnings > 0);
    Report {
        verdict: if failed { Verdict::Fail } else { Verdict::Pass },
        strict,
        counts,
        violations,
    }
}
