//! Degraded rendering that works without the pool.
//!
//! Used only after the primary path failed. Produces a plain monospace PDF
//! with a banner on every page, and never fails for any input: layout faults
//! become a one-page failure notice, and an unwritable output directory
//! falls back to the system temp directory.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use plain_pages::{failure_page, render_document, DocumentOptions, PageGeometry};

use crate::error::FallbackError;
use crate::models::{Artifact, PageSpec, ProducedBy};
use crate::rendering::extract_sections;

use super::artifact_store::ArtifactStore;

/// Stamped at the top of every degraded page
pub const DEGRADED_BANNER: &str =
    "DEGRADED OUTPUT: best-effort rendering produced because the primary renderer failed";

#[derive(Debug, Clone)]
pub struct FallbackRenderer {
    store: ArtifactStore,
    geometry: PageGeometry,
}

impl FallbackRenderer {
    pub fn new(store: ArtifactStore, page: PageSpec) -> Self {
        Self {
            store,
            geometry: page.text_geometry(),
        }
    }

    /// Render `content` as best it can and store the result.
    ///
    /// Only fails when neither the output directory nor the temp directory
    /// can be written.
    pub fn render_degraded(&self, content: &str, job_id: &str) -> Result<Artifact, FallbackError> {
        let start = Instant::now();

        let pdf = match self.layout(content, job_id) {
            Ok(pdf) => pdf,
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Degraded layout failed, writing failure notice");
                failure_page(&e.to_string())
            }
        };

        let artifact = match self.store.persist(job_id, ProducedBy::Fallback, &pdf) {
            Ok(artifact) => artifact,
            Err(e) => {
                let temp = std::env::temp_dir();
                tracing::warn!(
                    job_id,
                    dir = %self.store.dir().display(),
                    fallback_dir = %temp.display(),
                    error = %e,
                    "Output directory not writable, using temp directory"
                );
                ArtifactStore::persist_in(&temp, job_id, ProducedBy::Fallback, &pdf)?
            }
        };

        tracing::debug!(
            job_id,
            duration_ms = start.elapsed().as_millis() as u64,
            size = artifact.size_bytes,
            "Degraded render complete"
        );
        Ok(artifact)
    }

    fn layout(&self, content: &str, job_id: &str) -> Result<Vec<u8>, FallbackError> {
        let options = DocumentOptions::default()
            .geometry(self.geometry)
            .banner(DEGRADED_BANNER)
            .title(format!("{job_id} (degraded)"));

        let rendered = catch_unwind(AssertUnwindSafe(|| {
            render_document(&options, extract_sections(content))
        }))
        .map_err(|payload| FallbackError::Panic(panic_message(payload.as_ref())))?;
        Ok(rendered?)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
