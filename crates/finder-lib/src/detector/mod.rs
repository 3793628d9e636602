//! Bottleneck detectors for replayed request traces
//!
//! Two independent strategies over the same response-time vectors:
//! - a percentile-threshold detector driven through learn/check episodes
//!   by a three-state phase controller
//! - a regression-based detector decomposing the fitted model's R^2 into
//!   per-service relative-importance shares

mod importance;
mod percentile;
mod phase;

pub use importance::{
    importance_trend, ImportanceBand, ImportanceClassifier, ImportanceFinder, ImportanceReport,
    ImportanceRowVerdict, PredictorReport, DEFAULT_TAIL_PERCENT, DEFAULT_WARMUP_ROWS,
    MAX_PREDICTORS,
};
pub use percentile::{HistoryWindow, PercentileFinder};
pub use phase::{Phase, PhaseController};
