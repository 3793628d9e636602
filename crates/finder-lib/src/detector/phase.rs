//! Episode lifecycle for the percentile detector
//!
//! A three-state controller drives each learn/check episode over a
//! replayed trace: STANDBY -> LEARN (accumulate history) -> CHECK (score
//! against thresholds computed once on the transition) -> STANDBY. The
//! cycle repeats indefinitely; every reset discards all episode state.

use tracing::{debug, info};

use crate::detector::percentile::{HistoryWindow, PercentileFinder};
use crate::error::FinderError;
use crate::models::CheckVerdict;
use crate::trace::{PhaseMarkerKind, TraceEvent};

/// Lifecycle phase of the percentile detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Standby,
    Learn,
    Check,
}

/// Drives the percentile detector through learn/check episodes.
///
/// Check samples arriving outside CHECK are no-ops. A dimension mismatch
/// is fatal for the episode: the controller resets to STANDBY and returns
/// the error.
pub struct PhaseController {
    finder: PercentileFinder,
    phase: Phase,
    window: Option<HistoryWindow>,
    thresholds: Option<Vec<f64>>,
    episodes_completed: usize,
}

impl PhaseController {
    pub fn new(finder: PercentileFinder) -> Self {
        Self {
            finder,
            phase: Phase::Standby,
            window: None,
            thresholds: None,
            episodes_completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Thresholds for the current episode; `None` outside CHECK.
    pub fn thresholds(&self) -> Option<&[f64]> {
        self.thresholds.as_deref()
    }

    pub fn episodes_completed(&self) -> usize {
        self.episodes_completed
    }

    /// Number of samples learned in the current episode.
    pub fn learned_samples(&self) -> usize {
        self.window.as_ref().map(|w| w.samples()).unwrap_or(0)
    }

    /// Feed one classified event in arrival order.
    ///
    /// Returns a verdict only for check samples scored during CHECK;
    /// everything else is bookkeeping. Vector rows belong to the
    /// importance model and pass through untouched.
    pub fn handle(&mut self, event: &TraceEvent) -> Result<Option<CheckVerdict>, FinderError> {
        match event {
            TraceEvent::Marker(PhaseMarkerKind::EnterLearn) => {
                if self.phase == Phase::Standby {
                    debug!("phase transition: standby -> learn");
                    self.phase = Phase::Learn;
                }
                Ok(None)
            }
            TraceEvent::Marker(PhaseMarkerKind::EnterCheck) => {
                if self.phase == Phase::Learn {
                    self.enter_check()?;
                }
                Ok(None)
            }
            TraceEvent::Marker(PhaseMarkerKind::DetectionComplete) => {
                if self.phase == Phase::Check {
                    debug!(
                        episode = self.episodes_completed,
                        "phase transition: check -> standby"
                    );
                    self.reset_episode();
                    self.episodes_completed += 1;
                }
                Ok(None)
            }
            TraceEvent::LearnSample(values) => {
                if self.phase != Phase::Learn {
                    return Ok(None);
                }
                let window = self
                    .window
                    .get_or_insert_with(|| HistoryWindow::new(values.len()));
                if let Err(e) = window.record(values) {
                    self.reset_episode();
                    return Err(e);
                }
                Ok(None)
            }
            TraceEvent::CheckSample(values) => {
                if self.phase != Phase::Check {
                    // No verdict outside CHECK; nothing is mutated.
                    return Ok(None);
                }
                let Some(thresholds) = self.thresholds.as_ref() else {
                    return Ok(None);
                };
                match self.finder.check(values, thresholds) {
                    Ok(verdict) => Ok(Some(verdict)),
                    Err(e) => {
                        self.reset_episode();
                        Err(e)
                    }
                }
            }
            TraceEvent::VectorRow(_) => Ok(None),
        }
    }

    /// LEARN -> CHECK edge: freeze history and compute thresholds once.
    /// With no learned history the transition is not taken.
    fn enter_check(&mut self) -> Result<(), FinderError> {
        let window = self
            .window
            .as_ref()
            .ok_or(FinderError::InsufficientHistory { dimension: 0 })?;
        let thresholds = self.finder.compute_thresholds(window)?;
        info!(
            samples = window.samples(),
            ?thresholds,
            "phase transition: learn -> check"
        );
        self.thresholds = Some(thresholds);
        self.phase = Phase::Check;
        Ok(())
    }

    fn reset_episode(&mut self) {
        self.phase = Phase::Standby;
        self.window = None;
        self.thresholds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PhaseController {
        PhaseController::new(PercentileFinder::new(50.0, 100.0).unwrap())
    }

    fn learn(values: Vec<f64>) -> TraceEvent {
        TraceEvent::LearnSample(values)
    }

    fn check(values: Vec<f64>) -> TraceEvent {
        TraceEvent::CheckSample(values)
    }

    fn marker(kind: PhaseMarkerKind) -> TraceEvent {
        TraceEvent::Marker(kind)
    }

    #[test]
    fn test_full_episode_cycle() {
        let mut c = controller();
        assert_eq!(c.phase(), Phase::Standby);

        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        assert_eq!(c.phase(), Phase::Learn);
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            c.handle(&learn(vec![v, v + 1.0])).unwrap();
        }
        assert_eq!(c.learned_samples(), 5);

        c.handle(&marker(PhaseMarkerKind::EnterCheck)).unwrap();
        assert_eq!(c.phase(), Phase::Check);
        assert_eq!(c.thresholds(), Some(&[30.0, 31.0][..]));

        // Over the limit, dimension 0 over its threshold.
        let verdict = c.handle(&check(vec![90.0, 20.0])).unwrap().unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.anomalous_dimensions(), vec![0]);

        c.handle(&marker(PhaseMarkerKind::DetectionComplete)).unwrap();
        assert_eq!(c.phase(), Phase::Standby);
        assert_eq!(c.episodes_completed(), 1);
        assert!(c.thresholds().is_none());
    }

    #[test]
    fn test_check_sample_is_noop_outside_check() {
        let mut c = controller();
        assert_eq!(c.handle(&check(vec![500.0])).unwrap(), None);
        assert_eq!(c.thresholds(), None);

        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        c.handle(&learn(vec![10.0])).unwrap();
        assert_eq!(c.handle(&check(vec![500.0])).unwrap(), None);
        assert_eq!(c.phase(), Phase::Learn);
        assert_eq!(c.thresholds(), None);
    }

    #[test]
    fn test_reset_leaves_no_leaked_state() {
        let mut c = controller();
        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        for v in [1.0, 2.0, 3.0] {
            c.handle(&learn(vec![v, v, v])).unwrap();
        }
        c.handle(&marker(PhaseMarkerKind::EnterCheck)).unwrap();
        c.handle(&marker(PhaseMarkerKind::DetectionComplete)).unwrap();

        assert_eq!(c.learned_samples(), 0);

        // A new episode may use a different arity: nothing leaked.
        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        c.handle(&learn(vec![7.0])).unwrap();
        c.handle(&marker(PhaseMarkerKind::EnterCheck)).unwrap();
        assert_eq!(c.thresholds(), Some(&[7.0][..]));
    }

    #[test]
    fn test_arity_change_resets_episode() {
        let mut c = controller();
        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        c.handle(&learn(vec![1.0, 2.0])).unwrap();

        let err = c.handle(&learn(vec![1.0])).unwrap_err();
        assert_eq!(
            err,
            FinderError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(c.phase(), Phase::Standby);
        assert_eq!(c.learned_samples(), 0);
    }

    #[test]
    fn test_enter_check_without_history_stays_in_learn() {
        let mut c = controller();
        c.handle(&marker(PhaseMarkerKind::EnterLearn)).unwrap();
        let err = c.handle(&marker(PhaseMarkerKind::EnterCheck)).unwrap_err();
        assert!(matches!(err, FinderError::InsufficientHistory { .. }));
        assert_eq!(c.phase(), Phase::Learn);
    }

    #[test]
    fn test_markers_in_wrong_phase_are_ignored() {
        let mut c = controller();
        c.handle(&marker(PhaseMarkerKind::DetectionComplete)).unwrap();
        assert_eq!(c.phase(), Phase::Standby);
        assert_eq!(c.episodes_completed(), 0);

        c.handle(&marker(PhaseMarkerKind::EnterCheck)).unwrap();
        assert_eq!(c.phase(), Phase::Standby);
    }
}
