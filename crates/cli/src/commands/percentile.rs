//! Percentile-threshold replay command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use finder_lib::{Exceedance, PercentileFinder, Phase, PhaseController, TraceEvent};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_vector, print_info, print_table, print_warning, OutputFormat};

/// Thresholds computed at one LEARN -> CHECK transition.
#[derive(Serialize)]
struct EpisodeThresholds {
    episode: usize,
    thresholds: Vec<f64>,
}

/// One flagged check sample with its attributed services.
#[derive(Serialize)]
struct FlaggedCheck {
    /// Index among the trace's check samples.
    row: usize,
    episode: usize,
    total: f64,
    exceedances: Vec<Exceedance>,
}

#[derive(Serialize)]
struct PercentileRunReport {
    generated_at: String,
    percentile: f64,
    limit: f64,
    checks_scored: usize,
    episodes: Vec<EpisodeThresholds>,
    flagged: Vec<FlaggedCheck>,
}

/// Row for the flagged-samples table
#[derive(Tabled, Serialize)]
struct FlaggedRowView {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "Episode")]
    episode: usize,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Anomalous services")]
    services: String,
}

/// Replay a trace through the percentile detector, reporting thresholds
/// per episode and every flagged check sample.
pub fn run(file: &Path, limit: f64, percentile: f64, format: OutputFormat) -> Result<()> {
    let finder = PercentileFinder::new(percentile, limit)?;
    let events = super::load_events(file)?;
    let mut controller = PhaseController::new(finder);

    let mut episodes: Vec<EpisodeThresholds> = Vec::new();
    let mut flagged: Vec<FlaggedCheck> = Vec::new();
    let mut checks_seen = 0usize;

    for event in &events {
        let was_checking = controller.phase() == Phase::Check;
        let is_check_sample = matches!(event, TraceEvent::CheckSample(_));

        match controller.handle(event) {
            Ok(Some(verdict)) if verdict.flagged => flagged.push(FlaggedCheck {
                row: checks_seen,
                episode: episodes.len(),
                total: verdict.total,
                exceedances: verdict.exceedances,
            }),
            Ok(_) => {}
            Err(e) => print_warning(&format!("episode aborted: {}", e)),
        }

        if is_check_sample {
            checks_seen += 1;
        }
        if !was_checking && controller.phase() == Phase::Check {
            if let Some(thresholds) = controller.thresholds() {
                episodes.push(EpisodeThresholds {
                    episode: episodes.len() + 1,
                    thresholds: thresholds.to_vec(),
                });
            }
        }
    }

    match format {
        OutputFormat::Json => {
            let report = PercentileRunReport {
                generated_at: Utc::now().to_rfc3339(),
                percentile,
                limit,
                checks_scored: checks_seen,
                episodes,
                flagged,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            for episode in &episodes {
                print_info(&format!(
                    "episode {} thresholds: {}",
                    episode.episode,
                    format_vector(&episode.thresholds)
                ));
            }
            let rows: Vec<FlaggedRowView> = flagged
                .iter()
                .map(|f| FlaggedRowView {
                    row: f.row,
                    episode: f.episode,
                    total: format!("{:.2}", f.total),
                    services: f
                        .exceedances
                        .iter()
                        .map(|e| format!("{} ({:.2} > {:.2})", e.dimension, e.value, e.threshold))
                        .collect::<Vec<_>>()
                        .join("; "),
                })
                .collect();
            print_table(&rows);
            print_info(&format!(
                "{} check samples scored, {} flagged",
                checks_seen,
                flagged.len()
            ));
        }
    }

    Ok(())
}
