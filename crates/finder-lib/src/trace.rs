//! Trace-log classification and the vector store
//!
//! Turns raw trace-log lines into typed events for the replay loop. The
//! log format carries three kinds of payload lines: learn-phase samples
//! (`... (learn): [12, 9, 4]`), check-phase samples (`... (check): [...]`)
//! and full response-time vectors (`... vector: [12, 9, 4, 31]`, last
//! element = observed total). A line announcing a completed detection ends
//! the current episode.

use tracing::warn;

use crate::models::ResponseTimeVector;

/// Phase-transition markers for the percentile detector's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseMarkerKind {
    EnterLearn,
    EnterCheck,
    DetectionComplete,
}

/// One classified trace event, consumed in strict arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// Per-dimension sample observed during the learning window.
    LearnSample(Vec<f64>),
    /// Per-dimension sample to score against the learned thresholds.
    CheckSample(Vec<f64>),
    /// Explicit lifecycle transition.
    Marker(PhaseMarkerKind),
    /// Full response-time vector for the importance model.
    VectorRow(ResponseTimeVector),
}

/// Classify a raw trace line. Returns `None` for lines that carry no
/// event; malformed numerics inside a matching line drop the whole line
/// with a warning rather than producing a truncated sample.
pub fn classify_line(line: &str) -> Option<TraceEvent> {
    if let Some(values) = bracketed_values(line, "(learn):") {
        return Some(TraceEvent::LearnSample(values));
    }
    if let Some(values) = bracketed_values(line, "(check):") {
        return Some(TraceEvent::CheckSample(values));
    }
    if let Some(values) = bracketed_values(line, "vector:") {
        if values.len() < 2 {
            warn!(line, "vector row needs at least one service time and a total");
            return None;
        }
        let total = values[values.len() - 1];
        let services = values[..values.len() - 1].to_vec();
        return Some(TraceEvent::VectorRow(ResponseTimeVector::new(services, total)));
    }
    if line.contains("Detected") {
        return Some(TraceEvent::Marker(PhaseMarkerKind::DetectionComplete));
    }
    None
}

/// Extract the bracketed number list following `tag`, e.g.
/// `"(check): [12, 9, 4]"` -> `[12.0, 9.0, 4.0]`.
fn bracketed_values(line: &str, tag: &str) -> Option<Vec<f64>> {
    let after_tag = &line[line.find(tag)? + tag.len()..];
    let open = after_tag.find('[')?;
    let close = after_tag[open..].find(']')? + open;
    let body = &after_tag[open + 1..close];

    let mut values = Vec::new();
    for field in body.split(',') {
        match field.trim().parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => {
                warn!(line, field = field.trim(), "unparseable number in trace line");
                return None;
            }
        }
    }
    Some(values)
}

/// Insert the lifecycle markers the raw log format leaves implicit.
///
/// Trace logs carry no explicit enter_learn/enter_check lines: the first
/// learn sample after standby opens the learning window and the first
/// check sample after learning closes it. This pass makes those
/// transitions explicit so the phase controller can stay strict about
/// samples arriving outside their phase. Explicit markers already present
/// are honored and never duplicated.
pub fn with_inferred_markers<I>(events: I) -> Vec<TraceEvent>
where
    I: IntoIterator<Item = TraceEvent>,
{
    // Shadow phase: 0 = standby, 1 = learn, 2 = check.
    let mut phase = 0u8;
    let mut out = Vec::new();
    for event in events {
        match &event {
            TraceEvent::LearnSample(_) if phase == 0 => {
                out.push(TraceEvent::Marker(PhaseMarkerKind::EnterLearn));
                phase = 1;
            }
            TraceEvent::CheckSample(_) if phase == 1 => {
                out.push(TraceEvent::Marker(PhaseMarkerKind::EnterCheck));
                phase = 2;
            }
            TraceEvent::Marker(PhaseMarkerKind::EnterLearn) => phase = 1,
            TraceEvent::Marker(PhaseMarkerKind::EnterCheck) => phase = 2,
            TraceEvent::Marker(PhaseMarkerKind::DetectionComplete) => phase = 0,
            _ => {}
        }
        out.push(event);
    }
    out
}

/// Ordered, append-only collection of response-time vectors.
///
/// Vectors are appended in arrival order and never reordered or mutated;
/// both detectors read it incrementally.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    vectors: Vec<ResponseTimeVector>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one vector, returning its row index.
    pub fn push(&mut self, vector: ResponseTimeVector) -> usize {
        self.vectors.push(vector);
        self.vectors.len() - 1
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResponseTimeVector> {
        self.vectors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResponseTimeVector> {
        self.vectors.iter()
    }

    /// Collect every vector-row event from a trace into a store.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a TraceEvent>,
    {
        let mut store = Self::new();
        for event in events {
            if let TraceEvent::VectorRow(vector) = event {
                store.push(vector.clone());
            }
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_learn_line() {
        let event = classify_line("12:00:01 PercentileBasedFinder (learn): [10, 20, 5]");
        assert_eq!(
            event,
            Some(TraceEvent::LearnSample(vec![10.0, 20.0, 5.0]))
        );
    }

    #[test]
    fn test_classify_check_line() {
        let event = classify_line("12:05:44 PercentileBasedFinder (check): [55, 3, 9]");
        assert_eq!(event, Some(TraceEvent::CheckSample(vec![55.0, 3.0, 9.0])));
    }

    #[test]
    fn test_classify_vector_row_splits_total() {
        let event =
            classify_line("RelativeImportanceBasedFinder Response time vector: [5, 7, 3, 20]");
        let Some(TraceEvent::VectorRow(vector)) = event else {
            panic!("expected a vector row");
        };
        assert_eq!(vector.services, vec![5.0, 7.0, 3.0]);
        assert_eq!(vector.total, 20.0);
        assert_eq!(vector.residual(), 5.0);
    }

    #[test]
    fn test_classify_detection_complete() {
        let event = classify_line("12:09:10 Detected anomaly window closed");
        assert_eq!(
            event,
            Some(TraceEvent::Marker(PhaseMarkerKind::DetectionComplete))
        );
    }

    #[test]
    fn test_unrelated_line_is_ignored() {
        assert_eq!(classify_line("GET /health 200 3ms"), None);
        assert_eq!(classify_line(""), None);
    }

    #[test]
    fn test_malformed_number_drops_line() {
        assert_eq!(classify_line("x (check): [12, oops, 4]"), None);
    }

    #[test]
    fn test_vector_row_requires_total() {
        assert_eq!(classify_line("vector: [42]"), None);
    }

    #[test]
    fn test_inferred_markers_bracket_the_phases() {
        let events = vec![
            TraceEvent::LearnSample(vec![1.0]),
            TraceEvent::LearnSample(vec![2.0]),
            TraceEvent::CheckSample(vec![3.0]),
            TraceEvent::CheckSample(vec![4.0]),
            TraceEvent::Marker(PhaseMarkerKind::DetectionComplete),
            TraceEvent::LearnSample(vec![5.0]),
        ];
        let out = with_inferred_markers(events);
        assert_eq!(out[0], TraceEvent::Marker(PhaseMarkerKind::EnterLearn));
        assert_eq!(out[1], TraceEvent::LearnSample(vec![1.0]));
        assert_eq!(out[3], TraceEvent::Marker(PhaseMarkerKind::EnterCheck));
        assert_eq!(out[4], TraceEvent::CheckSample(vec![3.0]));
        // Second check sample gets no second marker.
        assert_eq!(out[5], TraceEvent::CheckSample(vec![4.0]));
        // A new episode starts after detection completes.
        assert_eq!(out[7], TraceEvent::Marker(PhaseMarkerKind::EnterLearn));
    }

    #[test]
    fn test_explicit_markers_not_duplicated() {
        let events = vec![
            TraceEvent::Marker(PhaseMarkerKind::EnterLearn),
            TraceEvent::LearnSample(vec![1.0]),
        ];
        let out = with_inferred_markers(events);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_store_appends_in_order() {
        let mut store = VectorStore::new();
        assert!(store.is_empty());
        let first = store.push(ResponseTimeVector::new(vec![1.0], 2.0));
        let second = store.push(ResponseTimeVector::new(vec![3.0], 4.0));
        assert_eq!((first, second), (0, 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().total, 4.0);
    }

    #[test]
    fn test_store_from_events_keeps_only_vector_rows() {
        let events = vec![
            TraceEvent::LearnSample(vec![1.0]),
            TraceEvent::VectorRow(ResponseTimeVector::new(vec![1.0, 2.0], 4.0)),
            TraceEvent::Marker(PhaseMarkerKind::DetectionComplete),
            TraceEvent::VectorRow(ResponseTimeVector::new(vec![2.0, 2.0], 5.0)),
        ];
        let store = VectorStore::from_events(&events);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().services, vec![1.0, 2.0]);
    }
}
