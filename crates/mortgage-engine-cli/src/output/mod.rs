pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full envelope as JSON
    Json,
    /// Result fields and schedules as tables
    Table,
    /// Schedules and sweeps as rows, otherwise field/value pairs
    Csv,
    /// Headline number only
    Minimal,
}

pub fn format_output(format: OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
