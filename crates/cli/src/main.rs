//! Request Bottleneck Finder CLI
//!
//! A command-line tool for replaying captured request-trace logs through
//! the percentile and relative-importance bottleneck detectors, and for
//! scoring detector output against a ground-truth response-time limit.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use finder_lib::detector::{DEFAULT_TAIL_PERCENT, DEFAULT_WARMUP_ROWS};
use output::OutputFormat;

const DEFAULT_PERCENTILE: f64 = 95.0;

/// Request Bottleneck Finder CLI
#[derive(Parser)]
#[command(name = "rbf")]
#[command(author, version, about = "Bottleneck finder for multi-service request traces", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay the percentile-threshold detector over a trace log
    Percentile {
        /// Trace log to replay
        #[arg(long, short, env = "RBF_TRACE_FILE")]
        file: PathBuf,

        /// Total-time limit defining an anomalous request
        #[arg(long, short)]
        limit: f64,

        /// Training percentile in the open interval (0, 100)
        #[arg(long, short)]
        percentile: Option<f64>,
    },

    /// Replay the relative-importance detector over a trace log
    Importance {
        /// Trace log to replay
        #[arg(long, short, env = "RBF_TRACE_FILE")]
        file: PathBuf,

        /// Total-time limit defining an anomalous request
        #[arg(long, short)]
        limit: f64,

        /// Tail width (percent) of the importance band, in (0, 50)
        #[arg(long)]
        tail: Option<f64>,

        /// Rows excluded from the training band
        #[arg(long)]
        warmup: Option<usize>,
    },

    /// Print the relative-importance trend for every service
    Trend {
        /// Trace log to replay
        #[arg(long, short, env = "RBF_TRACE_FILE")]
        file: PathBuf,
    },

    /// Score the percentile detector's verdicts against ground truth
    Evaluate {
        /// Trace log to replay
        #[arg(long, short, env = "RBF_TRACE_FILE")]
        file: PathBuf,

        /// Total-time limit defining an anomalous request
        #[arg(long, short)]
        limit: f64,

        /// Training percentile in the open interval (0, 100)
        #[arg(long, short)]
        percentile: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let defaults = config::Config::load().unwrap_or_default();
    let format = cli
        .format
        .or_else(|| {
            defaults
                .default_format
                .as_deref()
                .and_then(OutputFormat::from_name)
        })
        .unwrap_or_default();

    let percentile_default = defaults.default_percentile.unwrap_or(DEFAULT_PERCENTILE);

    match cli.command {
        Commands::Percentile {
            file,
            limit,
            percentile,
        } => {
            require_positive_limit(limit)?;
            commands::percentile::run(
                &file,
                limit,
                percentile.unwrap_or(percentile_default),
                format,
            )?;
        }
        Commands::Importance {
            file,
            limit,
            tail,
            warmup,
        } => {
            require_positive_limit(limit)?;
            let tail = tail
                .or(defaults.default_tail_percent)
                .unwrap_or(DEFAULT_TAIL_PERCENT);
            let warmup = warmup
                .or(defaults.default_warmup_rows)
                .unwrap_or(DEFAULT_WARMUP_ROWS);
            commands::importance::run(&file, limit, tail, warmup, format)?;
        }
        Commands::Trend { file } => {
            commands::trend::run(&file, format)?;
        }
        Commands::Evaluate {
            file,
            limit,
            percentile,
        } => {
            require_positive_limit(limit)?;
            commands::evaluate::run(
                &file,
                limit,
                percentile.unwrap_or(percentile_default),
                format,
            )?;
        }
    }

    Ok(())
}

fn require_positive_limit(limit: f64) -> Result<()> {
    if limit <= 0.0 {
        anyhow::bail!("Limit must be positive, got {}", limit);
    }
    Ok(())
}
