//! Output formatting for statements and suite reports.

use clap::ValueEnum;
use comfy_table::{Cell, Color, Table};
use crudkit_bench::SuiteReport;
use crudkit_core::Statement;
use serde_json::json;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Format generated statements.
pub fn format_statements(
    format: OutputFormat,
    statements: &[(&'static str, Statement)],
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Operation", "SQL", "Parameters"]);
            for (operation, stmt) in statements {
                let params = stmt
                    .params
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(vec![*operation, stmt.sql.as_str(), params.as_str()]);
            }
            Ok(table.to_string())
        }
        OutputFormat::Json => {
            let items: Vec<_> = statements
                .iter()
                .map(|(operation, stmt)| json!({ "operation": operation, "statement": stmt }))
                .collect();
            serde_json::to_string_pretty(&items)
        }
    }
}

/// Format a suite report.
pub fn format_report(
    format: OutputFormat,
    report: &SuiteReport,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Check", "Result", "Time (us)", "Detail"]);
            for check in &report.checks {
                let result = if check.passed {
                    Cell::new("pass").fg(Color::Green)
                } else {
                    Cell::new("FAIL").fg(Color::Red)
                };
                table.add_row(vec![
                    Cell::new(check.name),
                    result,
                    Cell::new(check.elapsed_us),
                    Cell::new(check.detail.as_deref().unwrap_or("")),
                ]);
            }
            Ok(format!(
                "{}\n{} passed, {} failed",
                table,
                report.passed(),
                report.failed()
            ))
        }
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}
