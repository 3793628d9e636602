//! Core data models for the bottleneck finder

use serde::{Deserialize, Serialize};

/// Per-service elapsed times for one completed request, plus the observed
/// end-to-end time.
///
/// Immutable once created. The residual (`total - sum(services)`) is the
/// time not attributed to any instrumented service; measurement noise can
/// legitimately make it negative, so callers must not assume otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeVector {
    /// Elapsed time per service, indexed by service position in the trace.
    pub services: Vec<f64>,
    /// Observed end-to-end request time.
    pub total: f64,
}

impl ResponseTimeVector {
    pub fn new(services: Vec<f64>, total: f64) -> Self {
        Self { services, total }
    }

    /// Number of instrumented services in this vector.
    pub fn dimensions(&self) -> usize {
        self.services.len()
    }

    /// Sum of the per-service times.
    pub fn service_sum(&self) -> f64 {
        self.services.iter().sum()
    }

    /// Time not attributed to any service. May be negative.
    pub fn residual(&self) -> f64 {
        self.total - self.service_sum()
    }
}

/// One dimension of a check sample that exceeded its learned threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exceedance {
    /// Service index within the sample.
    pub dimension: usize,
    /// Observed value at that index.
    pub value: f64,
    /// The percentile threshold it exceeded.
    pub threshold: f64,
}

/// Verdict for one check-phase sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckVerdict {
    /// Sum of the sample's per-service times.
    pub total: f64,
    /// True iff the total exceeded the configured limit.
    pub flagged: bool,
    /// Dimensions above their thresholds; populated only when flagged.
    pub exceedances: Vec<Exceedance>,
}

impl CheckVerdict {
    /// Indices of the services held responsible for the anomaly.
    pub fn anomalous_dimensions(&self) -> Vec<usize> {
        self.exceedances.iter().map(|e| e.dimension).collect()
    }
}

/// Relative-importance scores for one row of the design matrix.
///
/// A fit is only defined once the matrix has more rows than predictors;
/// rows seen before that point carry the `Insufficient` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowImportance {
    /// One R^2 share per predictor, summing to the full model's R^2.
    Scores(Vec<f64>),
    /// Not enough rows accumulated for a non-degenerate fit.
    Insufficient,
}

impl RowImportance {
    pub fn scores(&self) -> Option<&[f64]> {
        match self {
            RowImportance::Scores(s) => Some(s),
            RowImportance::Insufficient => None,
        }
    }
}
