//! Validate command - check a dataset directory and report violations.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use wardcheck::{
    DatasetValidator, Report, Severity, UnknownColumnPolicy, ValidatorConfig, Verdict, Violation,
};

/// Arguments of `wardcheck validate`.
pub struct ValidateArgs {
    pub data_dir: PathBuf,
    pub views_dir: Option<PathBuf>,
    pub strict: bool,
    pub flag_unknown_columns: bool,
    pub config: Option<PathBuf>,
    pub list: bool,
    pub limit: Option<usize>,
    pub json: Option<PathBuf>,
}

/// Run the validation; returns the process exit code.
pub fn run(args: ValidateArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    let json_to_stdout = args.json.as_deref().is_some_and(|p| p.as_os_str() == "-");

    if !json_to_stdout {
        println!(
            "{} {}",
            "Validating".cyan().bold(),
            args.data_dir.display().to_string().white()
        );
    }

    let report =
        DatasetValidator::with_config(config).validate_dir(&args.data_dir, args.views_dir)?;

    match &args.json {
        Some(_) if json_to_stdout => {
            println!("{}", report.to_json()?);
            return Ok(report.exit_code());
        }
        Some(path) => {
            fs::write(path, report.to_json()?)?;
        }
        None => {}
    }

    print_summary(&report);
    if args.list || args.limit.is_some() {
        print_violations(&report, args.limit);
    }
    if let Some(path) = &args.json {
        println!();
        println!("Report written to {}", path.display().to_string().white());
    }

    Ok(report.exit_code())
}

/// File configuration first, then flags on top.
fn build_config(args: &ValidateArgs) -> Result<ValidatorConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ValidatorConfig::load(path)?,
        None => ValidatorConfig::default(),
    };
    if args.strict {
        config = config.with_strict(true);
    }
    if args.flag_unknown_columns {
        config = config.with_unknown_columns(UnknownColumnPolicy::Flag);
    }
    Ok(config)
}

fn print_summary(report: &Report) {
    println!();
    let verdict = match report.verdict {
        Verdict::Pass => report.verdict.to_string().green().bold(),
        Verdict::Fail => report.verdict.to_string().red().bold(),
    };
    let mode = if report.strict { " (strict)" } else { "" };
    println!("Verdict: {}{}", verdict, mode);
    println!(
        "Found {} violations ({} errors, {} warnings)",
        report.counts.total().to_string().white().bold(),
        report.counts.errors.to_string().red(),
        report.counts.warnings.to_string().yellow()
    );

    let breakdown = report.breakdown();
    if breakdown.is_empty() {
        return;
    }

    println!();
    println!("{}", "Breakdown:".yellow().bold());
    for (table, rules) in &breakdown {
        println!("  {}", table.to_string().white().bold());
        for (rule, counts) in rules {
            let mut parts = Vec::new();
            if counts.errors > 0 {
                parts.push(format!("{} errors", counts.errors).red().to_string());
            }
            if counts.warnings > 0 {
                parts.push(format!("{} warnings", counts.warnings).yellow().to_string());
            }
            println!("    {:26} {}", rule.label(), parts.join(", "));
        }
    }
}

fn print_violations(report: &Report, limit: Option<usize>) {
    let shown = limit.unwrap_or(report.violations.len());
    println!();
    println!("{}", "Violations:".yellow().bold());
    for violation in report.violations.iter().take(shown) {
        println!("  {}", format_violation(violation));
    }
    let hidden = report.violations.len().saturating_sub(shown);
    if hidden > 0 {
        println!("  ... and {} more", hidden);
    }
}

fn format_violation(v: &Violation) -> String {
    let icon = match v.severity {
        Severity::Error => "✗".red(),
        Severity::Warning => "⚠".yellow(),
    };
    let mut location = v.table.to_string();
    if let Some(row) = &v.row {
        location.push(' ');
        location.push_str(&row.to_string());
    }
    if let Some(column) = &v.column {
        location.push(' ');
        location.push_str(column);
    }
    format!("{} {} {}", icon, location.dimmed(), v.message)
}
