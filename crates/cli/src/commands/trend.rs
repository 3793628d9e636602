//! Relative-importance trend command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use finder_lib::{importance_trend, RowImportance};
use serde::Serialize;

use crate::output::OutputFormat;

#[derive(Serialize)]
struct TrendJson {
    generated_at: String,
    rows: Vec<RowImportance>,
}

/// Print each predictor's relative-importance score as the model refits
/// over the replayed rows.
pub fn run(file: &Path, format: OutputFormat) -> Result<()> {
    let store = super::load_store(file)?;
    let Some(first) = store.iter().next() else {
        anyhow::bail!("No response-time vectors found in {}", file.display());
    };
    let predictors = first.dimensions();
    let trend = importance_trend(&store)?;

    match format {
        OutputFormat::Json => {
            let json = TrendJson {
                generated_at: Utc::now().to_rfc3339(),
                rows: trend,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            for api in 0..predictors {
                println!();
                println!("{}", format!("Relative importance trend for API{}", api).bold());
                for (row, importance) in trend.iter().enumerate() {
                    match importance.scores() {
                        Some(scores) => println!("{:>6}  {:.6}", row, scores[api]),
                        None => println!("{:>6}  {}", row, "insufficient data".yellow()),
                    }
                }
            }
        }
    }

    Ok(())
}
