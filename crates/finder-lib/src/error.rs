//! Error types for the detection engine

use thiserror::Error;

/// Errors produced by the detectors and the evaluator.
///
/// `InsufficientHistory` and `InsufficientData` are recoverable: the caller
/// should treat them as "no verdict yet" and keep feeding data.
/// `DimensionMismatch` is fatal for the current episode, which must reset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FinderError {
    /// A percentile was requested over a dimension with no learned samples.
    #[error("insufficient history: dimension {dimension} has no learned samples")]
    InsufficientHistory { dimension: usize },

    /// A regression fit was requested with too few observations.
    #[error("insufficient data: {rows} rows for {predictors} predictors")]
    InsufficientData { rows: usize, predictors: usize },

    /// A sample's arity changed mid-episode.
    #[error("dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Precision or recall was requested with a zero denominator.
    #[error("degenerate evaluation: no {0} events")]
    DegenerateEvaluation(&'static str),

    /// Subset enumeration would be intractable for this many predictors.
    #[error("{predictors} predictors exceeds the supported maximum of {limit}")]
    TooManyPredictors { predictors: usize, limit: usize },

    /// A percentile argument fell outside the open interval (0, 100).
    #[error("percentile {0} must be in the open interval (0, 100)")]
    InvalidPercentile(f64),
}
