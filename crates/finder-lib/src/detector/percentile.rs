//! Percentile-threshold bottleneck detection
//!
//! Learns a per-dimension percentile threshold from a training window of
//! per-service samples, then attributes anomalous requests to the services
//! whose times exceed their thresholds.

use serde::{Deserialize, Serialize};

use crate::error::FinderError;
use crate::models::{CheckVerdict, Exceedance};
use crate::stats::percentile;

/// Per-dimension history of values observed during the learning window.
///
/// Arity is fixed at construction, so a sample with the wrong number of
/// dimensions is rejected structurally instead of silently truncated.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    buckets: Vec<Vec<f64>>,
}

impl HistoryWindow {
    pub fn new(dimensions: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); dimensions],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.buckets.len()
    }

    /// Number of samples recorded so far (uniform across dimensions).
    pub fn samples(&self) -> usize {
        self.buckets.first().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.samples() == 0
    }

    /// Append one value per dimension.
    pub fn record(&mut self, values: &[f64]) -> Result<(), FinderError> {
        if values.len() != self.buckets.len() {
            return Err(FinderError::DimensionMismatch {
                expected: self.buckets.len(),
                actual: values.len(),
            });
        }
        for (bucket, &value) in self.buckets.iter_mut().zip(values) {
            bucket.push(value);
        }
        Ok(())
    }

    /// All values recorded for one dimension.
    pub fn values(&self, dimension: usize) -> &[f64] {
        &self.buckets[dimension]
    }
}

/// Configuration for the percentile-based detector: the training
/// percentile and the total-time limit that defines an anomalous request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PercentileFinder {
    percentile: f64,
    limit: f64,
}

impl PercentileFinder {
    /// `percentile` must lie in the open interval (0, 100).
    pub fn new(percentile: f64, limit: f64) -> Result<Self, FinderError> {
        if percentile <= 0.0 || percentile >= 100.0 {
            return Err(FinderError::InvalidPercentile(percentile));
        }
        Ok(Self { percentile, limit })
    }

    pub fn training_percentile(&self) -> f64 {
        self.percentile
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Compute one threshold per dimension from the learned history.
    pub fn compute_thresholds(&self, window: &HistoryWindow) -> Result<Vec<f64>, FinderError> {
        let mut thresholds = Vec::with_capacity(window.dimensions());
        for dimension in 0..window.dimensions() {
            let threshold = percentile(window.values(dimension), self.percentile)
                .ok_or(FinderError::InsufficientHistory { dimension })?;
            thresholds.push(threshold);
        }
        if thresholds.is_empty() {
            return Err(FinderError::InsufficientHistory { dimension: 0 });
        }
        Ok(thresholds)
    }

    /// Score one check sample against the thresholds. Purely a query.
    ///
    /// The sample is flagged iff its summed service time exceeds the limit;
    /// only then are individual dimensions attributed.
    pub fn check(&self, values: &[f64], thresholds: &[f64]) -> Result<CheckVerdict, FinderError> {
        if values.len() != thresholds.len() {
            return Err(FinderError::DimensionMismatch {
                expected: thresholds.len(),
                actual: values.len(),
            });
        }

        let total: f64 = values.iter().sum();
        let flagged = total > self.limit;
        let exceedances = if flagged {
            values
                .iter()
                .zip(thresholds)
                .enumerate()
                .filter(|(_, (value, threshold))| value > threshold)
                .map(|(dimension, (&value, &threshold))| Exceedance {
                    dimension,
                    value,
                    threshold,
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(CheckVerdict {
            total,
            flagged,
            exceedances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> PercentileFinder {
        PercentileFinder::new(50.0, 100.0).unwrap()
    }

    #[test]
    fn test_percentile_must_be_in_open_interval() {
        assert!(PercentileFinder::new(0.0, 100.0).is_err());
        assert!(PercentileFinder::new(100.0, 100.0).is_err());
        assert!(PercentileFinder::new(95.0, 100.0).is_ok());
    }

    #[test]
    fn test_threshold_from_known_history() {
        let mut window = HistoryWindow::new(1);
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            window.record(&[v]).unwrap();
        }
        let thresholds = finder().compute_thresholds(&window).unwrap();
        assert_eq!(thresholds, vec![30.0]);
    }

    #[test]
    fn test_thresholds_monotone_in_percentile() {
        let mut window = HistoryWindow::new(2);
        for v in [3.0, 9.0, 1.0, 7.0, 5.0] {
            window.record(&[v, v * 2.0]).unwrap();
        }
        let low = PercentileFinder::new(25.0, 100.0)
            .unwrap()
            .compute_thresholds(&window)
            .unwrap();
        let high = PercentileFinder::new(75.0, 100.0)
            .unwrap()
            .compute_thresholds(&window)
            .unwrap();
        for (l, h) in low.iter().zip(&high) {
            assert!(l <= h);
        }
    }

    #[test]
    fn test_empty_history_is_insufficient() {
        let window = HistoryWindow::new(2);
        assert_eq!(
            finder().compute_thresholds(&window),
            Err(FinderError::InsufficientHistory { dimension: 0 })
        );
    }

    #[test]
    fn test_record_rejects_arity_change() {
        let mut window = HistoryWindow::new(3);
        window.record(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            window.record(&[1.0, 2.0]),
            Err(FinderError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
        // The mismatched sample must not have been partially applied.
        assert_eq!(window.samples(), 1);
    }

    #[test]
    fn test_check_flags_and_attributes() {
        let verdict = finder().check(&[60.0, 50.0, 5.0], &[40.0, 55.0, 10.0]).unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.total, 115.0);
        assert_eq!(verdict.anomalous_dimensions(), vec![0]);
        assert_eq!(verdict.exceedances[0].threshold, 40.0);
    }

    #[test]
    fn test_check_below_limit_attributes_nothing() {
        // Dimension 0 exceeds its threshold but the total stays under the limit.
        let verdict = finder().check(&[50.0, 10.0], &[40.0, 55.0]).unwrap();
        assert!(!verdict.flagged);
        assert!(verdict.exceedances.is_empty());
    }

    #[test]
    fn test_check_rejects_arity_mismatch() {
        assert!(finder().check(&[1.0, 2.0], &[1.0]).is_err());
    }
}
