//! Trace replay commands

pub mod evaluate;
pub mod importance;
pub mod percentile;
pub mod trend;

use std::path::Path;

use anyhow::{Context, Result};
use finder_lib::{classify_line, with_inferred_markers, TraceEvent, VectorStore};
use tracing::debug;

/// Read a trace file and classify its lines, inserting the lifecycle
/// markers the raw log format leaves implicit.
pub fn load_events(path: &Path) -> Result<Vec<TraceEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    let events: Vec<TraceEvent> = content.lines().filter_map(classify_line).collect();
    debug!(path = %path.display(), events = events.len(), "classified trace file");
    Ok(with_inferred_markers(events))
}

/// Read a trace file and keep only its response-time vector rows.
pub fn load_store(path: &Path) -> Result<VectorStore> {
    let events = load_events(path)?;
    Ok(VectorStore::from_events(&events))
}
