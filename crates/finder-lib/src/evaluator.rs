//! Detection-quality evaluation
//!
//! Compares a detector's per-row anomaly calls against the ground-truth
//! rule (total time over a fixed limit) and reports precision and recall.
//! A detector firing on several consecutive rows is counted as a single
//! identified event, the same way repeated alerts for one underlying
//! incident are collapsed.

use serde::{Deserialize, Serialize};

use crate::error::FinderError;

/// Streaming evaluator over (ground truth, detector flag) pairs.
#[derive(Debug, Clone)]
pub struct Evaluator {
    limit: f64,
    anomalous_events: u64,
    identified_events: u64,
    correct_identifications: u64,
    in_episode: bool,
    episode_correct: bool,
}

impl Evaluator {
    pub fn new(limit: f64) -> Self {
        Self {
            limit,
            anomalous_events: 0,
            identified_events: 0,
            correct_identifications: 0,
            in_episode: false,
            episode_correct: false,
        }
    }

    /// Record one replayed row: the observed total (ground truth is
    /// `total > limit`) and whether the detector flagged the row.
    pub fn record(&mut self, total: f64, flagged: bool) {
        let truth = total > self.limit;
        if truth {
            self.anomalous_events += 1;
        }

        if flagged {
            if !self.in_episode {
                self.in_episode = true;
                self.episode_correct = false;
                self.identified_events += 1;
            }
            if truth {
                self.episode_correct = true;
            }
        } else {
            self.close_episode();
        }
    }

    fn close_episode(&mut self) {
        if self.in_episode {
            if self.episode_correct {
                self.correct_identifications += 1;
            }
            self.in_episode = false;
            self.episode_correct = false;
        }
    }

    /// Close any open episode and produce the report.
    pub fn finish(mut self) -> EvaluationReport {
        self.close_episode();
        EvaluationReport {
            anomalous_events: self.anomalous_events,
            identified_events: self.identified_events,
            correct_identifications: self.correct_identifications,
        }
    }
}

/// Counts from one evaluation run. Precision and recall are derived on
/// demand so that zero denominators surface as explicit errors instead of
/// silently wrong figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Rows whose total exceeded the limit (ground truth).
    pub anomalous_events: u64,
    /// Distinct flagged episodes (consecutive flagged rows collapse).
    pub identified_events: u64,
    /// Identified episodes overlapping at least one ground-truth anomaly.
    pub correct_identifications: u64,
}

impl EvaluationReport {
    /// Percentage of identified episodes that were correct.
    pub fn precision(&self) -> Result<f64, FinderError> {
        if self.identified_events == 0 {
            return Err(FinderError::DegenerateEvaluation("identified"));
        }
        Ok(self.correct_identifications as f64 * 100.0 / self.identified_events as f64)
    }

    /// Percentage of ground-truth anomalies covered by a correct episode.
    pub fn recall(&self) -> Result<f64, FinderError> {
        if self.anomalous_events == 0 {
            return Err(FinderError::DegenerateEvaluation("anomalous"));
        }
        Ok(self.correct_identifications as f64 * 100.0 / self.anomalous_events as f64)
    }
}
