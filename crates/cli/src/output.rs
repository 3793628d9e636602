//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use finder_lib::FinderError;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a precision/recall figure, showing degenerate denominators as
/// an explicit `undefined` rather than a bogus zero.
pub fn format_metric(value: &Result<f64, FinderError>) -> String {
    match value {
        Ok(v) => format!("{:.2}%", v).green().to_string(),
        Err(_) => "undefined".yellow().to_string(),
    }
}

/// Render a threshold vector the way it appears in trace logs.
pub fn format_vector(values: &[f64]) -> String {
    let body = values
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", body)
}
