//! Assertion helpers for tests.

use std::path::Path;

use pressroom::models::{ProducedBy, RenderResult};
use pressroom::services::PoolEvent;
use pretty_assertions::assert_eq;
use tokio::sync::broadcast;

/// Assert the file exists, is non-empty and looks like a PDF
pub fn assert_pdf_file(path: &Path) -> Vec<u8> {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|e| panic!("Expected artifact at {}: {e}", path.display()));
    assert!(!bytes.is_empty(), "Artifact {} is empty", path.display());
    assert!(
        bytes.starts_with(b"%PDF-"),
        "Expected PDF header, got {:?}",
        &bytes[..8.min(bytes.len())]
    );
    bytes
}

/// Assert the artifact bytes contain `needle`
pub fn assert_contains_text(bytes: &[u8], needle: &str) {
    assert!(
        bytes.windows(needle.len()).any(|w| w == needle.as_bytes()),
        "Expected artifact to contain {needle:?}"
    );
}

/// Assert which render path produced the result and that its file is valid
pub fn assert_produced_by(result: &RenderResult, expected: ProducedBy) -> Vec<u8> {
    assert_eq!(
        result.produced_by(),
        expected,
        "Unexpected render path, fallback reason: {:?}",
        result.fallback_reason()
    );
    assert_eq!(result.artifact().produced_by, expected);
    let bytes = assert_pdf_file(result.path());
    assert_eq!(result.artifact().size_bytes, bytes.len() as u64);
    bytes
}

/// Collect every event currently buffered in `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<PoolEvent>) -> Vec<PoolEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Attempt numbers of the task-error events for `job`
pub fn task_error_attempts(events: &[PoolEvent], job: &str) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            PoolEvent::TaskError {
                job_id, attempt, ..
            } if job_id == job => Some(*attempt),
            _ => None,
        })
        .collect()
}

/// Reasons of all worker-recycled events
pub fn recycle_reasons(events: &[PoolEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|e| match e {
            PoolEvent::WorkerRecycled { reason, .. } => Some(*reason),
            _ => None,
        })
        .collect()
}
