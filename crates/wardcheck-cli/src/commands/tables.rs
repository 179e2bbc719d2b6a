//! Tables command - print the schema registry.

use colored::Colorize;
use wardcheck::{ColumnSpec, TableName};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    for table in TableName::ALL {
        let spec = table.spec();
        let role = if table.is_required() {
            "required".green()
        } else {
            "derived view".blue()
        };
        let key = if spec.key_columns.is_empty() {
            "row position".to_string()
        } else {
            spec.key_columns.join(", ")
        };

        println!("{} ({})", table.file_name().cyan().bold(), role);
        println!("  key: {}", key.white());
        for column in &spec.columns {
            println!("  {:42} {}", column.name, describe(column).dimmed());
        }
        println!();
    }
    Ok(())
}

fn describe(column: &ColumnSpec) -> String {
    let mut text = column.kind.to_string();
    if let Some(allowed) = &column.allowed_values {
        text.push_str(&format!(" {{{}}}", allowed.join(", ")));
    }
    if let Some(range) = &column.range {
        text.push_str(&format!(" {}", range));
    }
    if column.nullable {
        text.push_str(" nullable");
    }
    text
}
