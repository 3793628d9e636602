//! Relative-importance replay command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use finder_lib::{ImportanceClassifier, ImportanceReport};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_table, OutputFormat};

#[derive(Serialize)]
struct ImportanceJson {
    generated_at: String,
    limit: f64,
    tail_percent: f64,
    warmup_rows: usize,
    report: ImportanceReport,
}

/// Row for the out-of-band table
#[derive(Tabled, Serialize)]
struct OutOfBandRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Ground truth")]
    ground_truth: String,
}

/// Replay a trace's vector rows through the importance classifier and
/// report each predictor's band with its out-of-band rows.
pub fn run(
    file: &Path,
    limit: f64,
    tail: f64,
    warmup: usize,
    format: OutputFormat,
) -> Result<()> {
    let classifier = ImportanceClassifier::new(limit, tail, warmup)?;
    let store = super::load_store(file)?;
    if store.is_empty() {
        anyhow::bail!("No response-time vectors found in {}", file.display());
    }
    let report = classifier.classify(&store)?;

    match format {
        OutputFormat::Json => {
            let json = ImportanceJson {
                generated_at: Utc::now().to_rfc3339(),
                limit,
                tail_percent: tail,
                warmup_rows: warmup,
                report,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            for predictor in &report.predictors {
                println!();
                print_info(&format!(
                    "API{} band: ({:.6} - {:.6})",
                    predictor.dimension, predictor.band.low, predictor.band.high
                ));
                let rows: Vec<OutOfBandRow> = predictor
                    .rows
                    .iter()
                    .filter(|r| r.out_of_band())
                    .map(|r| OutOfBandRow {
                        row: r.row,
                        score: format!("{:.6}", r.score),
                        direction: if r.below_band {
                            "below".to_string()
                        } else {
                            "above".to_string()
                        },
                        ground_truth: if r.ground_truth_anomaly {
                            "anomalous".red().to_string()
                        } else {
                            "normal".green().to_string()
                        },
                    })
                    .collect();
                print_table(&rows);
            }
            println!();
            print_info(&format!(
                "{} rows replayed across {} predictors",
                store.len(),
                report.predictors.len()
            ));
        }
    }

    Ok(())
}
