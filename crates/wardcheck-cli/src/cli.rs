//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wardcheck: integrity validator for the hourly hospital deterioration dataset
#[derive(Parser)]
#[command(name = "wardcheck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a dataset directory
    Validate {
        /// Directory holding patients.csv, vitals_timeseries.csv and labs_timeseries.csv
        #[arg(value_name = "DATA_DIR")]
        data_dir: PathBuf,

        /// Directory holding the derived views (default: DATA_DIR, then ../generated)
        #[arg(long, value_name = "DIR")]
        views_dir: Option<PathBuf>,

        /// Count warnings toward the verdict
        #[arg(long)]
        strict: bool,

        /// Report columns the schema does not declare
        #[arg(long)]
        flag_unknown_columns: bool,

        /// JSON configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print every violation
        #[arg(short, long)]
        list: bool,

        /// Print at most N violations (implies --list)
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Write the report as JSON to PATH ("-" for stdout)
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,
    },

    /// Show the table registry
    Tables,
}
