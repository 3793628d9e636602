//! Regression-based bottleneck detection
//!
//! Fits an incremental multiple-linear-regression model of the observed
//! total time on the per-service times, and decomposes the model's R^2
//! into per-service LMG (Shapley) relative-importance shares by averaging
//! the marginal R^2 gain of each predictor over all subsets of the others.
//! Subset enumeration is exponential in the service count, which stays in
//! the single digits for real traces; a hard ceiling guards the pathological
//! case.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FinderError;
use crate::models::{ResponseTimeVector, RowImportance};
use crate::stats::{fit_r_squared, percentile};
use crate::trace::VectorStore;

/// Hard ceiling on predictor count: beyond this the 2^k subset
/// enumeration is no longer tractable.
pub const MAX_PREDICTORS: usize = 12;

/// Rows excluded from the training band to avoid fitting percentiles on
/// barely-initialized importance scores.
pub const DEFAULT_WARMUP_ROWS: usize = 60;

/// Default symmetric tail width (percent) for the importance band.
pub const DEFAULT_TAIL_PERCENT: f64 = 1.0;

/// Incrementally fit relative-importance model.
///
/// Rows are appended in arrival order and never removed. A fit is only
/// defined once the row count exceeds the predictor count.
#[derive(Debug, Clone, Default)]
pub struct ImportanceFinder {
    rows: Vec<Vec<f64>>,
    totals: Vec<f64>,
}

impl ImportanceFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Predictor count, fixed by the first appended row.
    pub fn predictors(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Append one request's service times and total to the design matrix.
    pub fn add_row(&mut self, vector: &ResponseTimeVector) -> Result<(), FinderError> {
        if self.rows.is_empty() {
            if vector.dimensions() > MAX_PREDICTORS {
                return Err(FinderError::TooManyPredictors {
                    predictors: vector.dimensions(),
                    limit: MAX_PREDICTORS,
                });
            }
        } else if vector.dimensions() != self.predictors() {
            return Err(FinderError::DimensionMismatch {
                expected: self.predictors(),
                actual: vector.dimensions(),
            });
        }
        self.rows.push(vector.services.clone());
        self.totals.push(vector.total);
        Ok(())
    }

    /// LMG relative-importance scores: one non-negative R^2 share per
    /// predictor, summing to the full model's R^2.
    ///
    /// `InsufficientData` until the row count exceeds the predictor count.
    /// Rank-deficient subsets score R^2 = 0 instead of failing the whole
    /// decomposition.
    pub fn fit(&self) -> Result<Vec<f64>, FinderError> {
        let k = self.predictors();
        if self.rows.len() <= k || k == 0 {
            return Err(FinderError::InsufficientData {
                rows: self.rows.len(),
                predictors: k,
            });
        }

        // R^2 once per predictor subset, shared across all k Shapley sums.
        let full_mask = (1usize << k) - 1;
        let mut subset_r2 = vec![0.0; 1 << k];
        for mask in 1..=full_mask {
            subset_r2[mask] = fit_r_squared(&self.subset_rows(mask), &self.totals);
        }

        let mut factorial = vec![1.0; k + 1];
        for i in 1..=k {
            factorial[i] = factorial[i - 1] * i as f64;
        }

        let mut scores = vec![0.0; k];
        for (j, score) in scores.iter_mut().enumerate() {
            let bit = 1usize << j;
            for mask in 0..=full_mask {
                if mask & bit != 0 {
                    continue;
                }
                let size = mask.count_ones() as usize;
                let weight = factorial[size] * factorial[k - 1 - size] / factorial[k];
                *score += weight * (subset_r2[mask | bit] - subset_r2[mask]);
            }
        }

        debug!(
            rows = self.rows.len(),
            predictors = k,
            full_r2 = subset_r2[full_mask],
            "fitted relative importance"
        );
        Ok(scores)
    }

    /// Predictor columns selected by `mask`, one row per observation.
    fn subset_rows(&self, mask: usize) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(j, _)| mask & (1 << j) != 0)
                    .map(|(_, &v)| v)
                    .collect()
            })
            .collect()
    }
}

/// Fit the current model, mapping the not-enough-rows case to the
/// `Insufficient` row marker and propagating everything else.
fn fit_or_insufficient(model: &ImportanceFinder) -> Result<RowImportance, FinderError> {
    match model.fit() {
        Ok(scores) => Ok(RowImportance::Scores(scores)),
        Err(FinderError::InsufficientData { .. }) => Ok(RowImportance::Insufficient),
        Err(e) => Err(e),
    }
}

/// Per-row importance trend: the model refit after every appended vector.
pub fn importance_trend(store: &VectorStore) -> Result<Vec<RowImportance>, FinderError> {
    let mut model = ImportanceFinder::new();
    let mut per_row = Vec::with_capacity(store.len());
    for vector in store.iter() {
        model.add_row(vector)?;
        per_row.push(fit_or_insufficient(&model)?);
    }
    Ok(per_row)
}

/// Symmetric percentile band over a predictor's training scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportanceBand {
    pub low: f64,
    pub high: f64,
}

/// One predictor's verdict for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRowVerdict {
    /// Row index in the vector store.
    pub row: usize,
    /// The predictor's importance score at this row.
    pub score: f64,
    pub below_band: bool,
    pub above_band: bool,
    /// Whether the row's total exceeded the configured limit.
    pub ground_truth_anomaly: bool,
}

impl ImportanceRowVerdict {
    pub fn out_of_band(&self) -> bool {
        self.below_band || self.above_band
    }
}

/// Band and per-row verdicts for one predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorReport {
    pub dimension: usize,
    pub band: ImportanceBand,
    pub rows: Vec<ImportanceRowVerdict>,
}

/// Output of a full importance replay over a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceReport {
    /// Full-model importance scores per row, in arrival order.
    pub per_row: Vec<RowImportance>,
    pub predictors: Vec<PredictorReport>,
}

/// Classifies per-row importance scores against a percentile band learned
/// from non-anomalous, post-warm-up rows.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceClassifier {
    limit: f64,
    tail_percent: f64,
    warmup_rows: usize,
}

impl ImportanceClassifier {
    /// `tail_percent` is the width of each tail: the band spans the
    /// `[tail, 100 - tail]` percentiles, so it must lie in (0, 50).
    pub fn new(limit: f64, tail_percent: f64, warmup_rows: usize) -> Result<Self, FinderError> {
        if tail_percent <= 0.0 || tail_percent >= 50.0 {
            return Err(FinderError::InvalidPercentile(tail_percent));
        }
        Ok(Self {
            limit,
            tail_percent,
            warmup_rows,
        })
    }

    /// Replay the store through two models and classify every row.
    ///
    /// The training model sees only rows whose total stayed within the
    /// limit; its post-warm-up scores define each predictor's band. The
    /// full model sees every row, and each row's full-model score outside
    /// the band flags that predictor at that row.
    pub fn classify(&self, store: &VectorStore) -> Result<ImportanceReport, FinderError> {
        let Some(first) = store.iter().next() else {
            return Err(FinderError::InsufficientData {
                rows: 0,
                predictors: 0,
            });
        };
        let predictors = first.dimensions();

        let mut training_model = ImportanceFinder::new();
        let mut training: Vec<Option<RowImportance>> = vec![None; store.len()];
        for (i, vector) in store.iter().enumerate() {
            if vector.total <= self.limit {
                training_model.add_row(vector)?;
                training[i] = Some(fit_or_insufficient(&training_model)?);
            }
        }

        let per_row = importance_trend(store)?;

        let mut reports = Vec::with_capacity(predictors);
        for dimension in 0..predictors {
            let band_scores: Vec<f64> = training
                .iter()
                .enumerate()
                .filter(|(i, _)| *i >= self.warmup_rows)
                .filter_map(|(_, row)| {
                    row.as_ref()
                        .and_then(|r| r.scores())
                        .map(|scores| scores[dimension])
                })
                .collect();

            let low = percentile(&band_scores, self.tail_percent)
                .ok_or(FinderError::InsufficientHistory { dimension })?;
            let high = percentile(&band_scores, 100.0 - self.tail_percent)
                .ok_or(FinderError::InsufficientHistory { dimension })?;

            let rows = per_row
                .iter()
                .enumerate()
                .filter_map(|(row, importance)| {
                    let score = importance.scores()?[dimension];
                    let total = store.get(row)?.total;
                    Some(ImportanceRowVerdict {
                        row,
                        score,
                        below_band: score < low,
                        above_band: score > high,
                        ground_truth_anomaly: total > self.limit,
                    })
                })
                .collect();

            reports.push(PredictorReport {
                dimension,
                band: ImportanceBand { low, high },
                rows,
            });
        }

        Ok(ImportanceReport {
            per_row,
            predictors: reports,
        })
    }
}
