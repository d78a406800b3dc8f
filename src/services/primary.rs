//! High-fidelity rendering on a pooled worker.

use std::sync::Arc;
use std::time::Instant;

use crate::error::TaskError;
use crate::models::{Artifact, PrintOptions, ProducedBy, RenderJob};

use super::artifact_store::ArtifactStore;
use super::worker::WorkerHandle;

/// Drives one worker through load, settle and print, then stores the PDF.
///
/// Failures are returned as-is; deciding what to do about them is the
/// coordinator's job.
#[derive(Debug, Clone)]
pub struct PrimaryRenderer {
    options: Arc<PrintOptions>,
    store: ArtifactStore,
}

impl PrimaryRenderer {
    pub fn new(options: PrintOptions, store: ArtifactStore) -> Self {
        Self {
            options: Arc::new(options),
            store,
        }
    }

    pub fn options(&self) -> &PrintOptions {
        &self.options
    }

    pub async fn render(&self, worker: &WorkerHandle, job: &RenderJob) -> Result<Artifact, TaskError> {
        let start = Instant::now();

        worker.load(job.content.clone()).await?;
        let report = worker.settle().await?;
        tracing::debug!(
            job_id = %job.job_id,
            worker_id = worker.id(),
            blocks = report.blocks,
            "Content settled"
        );

        let pdf = worker.print(PrintOptions::clone(&self.options)).await?;
        if pdf.is_empty() {
            return Err(TaskError::Execution("engine produced an empty document".to_string()));
        }
        let render_ms = start.elapsed().as_millis();

        let store = self.store.clone();
        let job_id = job.job_id.clone();
        let artifact = tokio::task::spawn_blocking(move || {
            store.persist(&job_id, ProducedBy::Primary, &pdf)
        })
        .await
        .map_err(|e| TaskError::Execution(format!("artifact write task failed: {e}")))?
        .map_err(|e| TaskError::Execution(format!("failed to write artifact: {e}")))?;

        tracing::debug!(
            job_id = %job.job_id,
            worker_id = worker.id(),
            render_ms = render_ms as u64,
            total_ms = start.elapsed().as_millis() as u64,
            size = artifact.size_bytes,
            "Primary render complete"
        );
        Ok(artifact)
    }
}
