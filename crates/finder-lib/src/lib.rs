//! Detection engine for multi-service request traces
//!
//! This crate provides the core functionality for:
//! - Classifying trace-log lines into typed replay events
//! - Percentile-threshold anomaly detection over learn/check episodes
//! - Regression-based relative-importance bottleneck attribution
//! - Precision/recall evaluation against a ground-truth limit

pub mod detector;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod stats;
pub mod trace;

pub use detector::{
    importance_trend, ImportanceClassifier, ImportanceFinder, ImportanceReport, PercentileFinder,
    Phase, PhaseController,
};
pub use error::FinderError;
pub use evaluator::{EvaluationReport, Evaluator};
pub use models::*;
pub use trace::{classify_line, with_inferred_markers, PhaseMarkerKind, TraceEvent, VectorStore};
