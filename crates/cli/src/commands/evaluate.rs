//! Precision/recall evaluation command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use finder_lib::{Evaluator, PercentileFinder, PhaseController};
use serde::Serialize;

use crate::output::{format_metric, print_warning, OutputFormat};

#[derive(Serialize)]
struct EvaluationJson {
    generated_at: String,
    limit: f64,
    percentile: f64,
    anomalous_events: u64,
    identified_events: u64,
    correct_identifications: u64,
    /// Absent when no episode was identified.
    precision: Option<f64>,
    /// Absent when the trace holds no ground-truth anomaly.
    recall: Option<f64>,
}

/// Replay the percentile detector over a trace and score its verdicts
/// against the ground-truth limit.
pub fn run(file: &Path, limit: f64, percentile: f64, format: OutputFormat) -> Result<()> {
    let finder = PercentileFinder::new(percentile, limit)?;
    let events = super::load_events(file)?;
    let mut controller = PhaseController::new(finder);
    let mut evaluator = Evaluator::new(limit);

    for event in &events {
        match controller.handle(event) {
            Ok(Some(verdict)) => evaluator.record(verdict.total, verdict.flagged),
            Ok(None) => {}
            Err(e) => print_warning(&format!("episode aborted: {}", e)),
        }
    }

    let report = evaluator.finish();
    let precision = report.precision();
    let recall = report.recall();

    match format {
        OutputFormat::Json => {
            let json = EvaluationJson {
                generated_at: Utc::now().to_rfc3339(),
                limit,
                percentile,
                anomalous_events: report.anomalous_events,
                identified_events: report.identified_events,
                correct_identifications: report.correct_identifications,
                precision: precision.ok(),
                recall: recall.ok(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", "Evaluation".bold());
            println!("{}", "=".repeat(40));
            println!("True anomalies:          {}", report.anomalous_events);
            println!("Identified anomalies:    {}", report.identified_events);
            println!("Correct identifications: {}", report.correct_identifications);
            println!("Precision:               {}", format_metric(&precision));
            println!("Recall:                  {}", format_metric(&recall));
        }
    }

    Ok(())
}
