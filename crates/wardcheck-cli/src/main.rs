//! Wardcheck CLI - dataset integrity validator.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

/// Exit code for runs that could not produce a report.
const EXIT_FATAL: i32 = 2;

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            data_dir,
            views_dir,
            strict,
            flag_unknown_columns,
            config,
            list,
            limit,
            json,
        } => commands::validate::run(commands::validate::ValidateArgs {
            data_dir,
            views_dir,
            strict,
            flag_unknown_columns,
            config,
            list,
            limit,
            json,
        }),

        Commands::Tables => commands::tables::run().map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
