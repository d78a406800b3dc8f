//! Public entry point: primary rendering with fallback on any failure.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;

use crate::error::{FallbackError, PoolError, RenderError, TaskError};
use crate::models::{AppConfig, Artifact, AttemptOutcome, ProducedBy, RenderAttempt, RenderJob, RenderResult};
use crate::rendering::LayoutEngineLauncher;

use super::artifact_store::ArtifactStore;
use super::fallback::FallbackRenderer;
use super::primary::PrimaryRenderer;
use super::worker::EngineLauncher;
use super::worker_pool::WorkerPool;

/// Turns content into a PDF artifact, whatever happens to the primary path.
///
/// Every submission ends in exactly one of: a primary artifact, a degraded
/// artifact, `ShuttingDown`, or `Unrecoverable` when not even the fallback
/// could write a file.
pub struct RenderCoordinator {
    pool: WorkerPool,
    primary: PrimaryRenderer,
    fallback: FallbackRenderer,
    hooks_registered: AtomicBool,
}

impl RenderCoordinator {
    /// Coordinator backed by the built-in layout engine.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_launcher(config, Arc::new(LayoutEngineLauncher))
    }

    pub fn with_launcher(config: &AppConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        let store = ArtifactStore::new(config.output.resolved_dir());
        Self {
            pool: WorkerPool::new(&config.pool, launcher),
            primary: PrimaryRenderer::new(config.page.print_options(), store.clone()),
            fallback: FallbackRenderer::new(store, config.page.page_spec()),
            hooks_registered: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Render `content` for `job_id`.
    pub async fn submit(&self, job_id: &str, content: &str) -> Result<RenderResult, RenderError> {
        let job = RenderJob::new(job_id, content);
        tracing::info!(job_id, bytes = content.len(), "Render job submitted");

        let outcome = match self.pool.init().await {
            Ok(()) => {
                let primary = &self.primary;
                let job = &job;
                self.pool
                    .execute(job_id, |ctx| async move {
                        let record = AttemptRecord::start(&job.job_id, ctx.attempt);
                        let result = primary.render(&ctx.worker, job).await;
                        record.finish(&result);
                        result
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        let error = match outcome {
            Ok(artifact) => {
                tracing::info!(
                    job_id,
                    path = %artifact.path.display(),
                    elapsed_ms = (chrono::Utc::now() - job.created_at).num_milliseconds(),
                    "Render job completed"
                );
                return Ok(RenderResult::Primary { artifact });
            }
            Err(PoolError::ShuttingDown) => {
                tracing::info!(job_id, "Render job rejected, shutting down");
                return Err(RenderError::ShuttingDown);
            }
            Err(e) => e,
        };

        let reason = error.to_string();
        tracing::warn!(job_id, reason = %reason, "Primary render failed, using fallback");
        let artifact = self.degrade(&job).await?;
        Ok(RenderResult::Fallback { artifact, reason })
    }

    /// Stop accepting jobs and wait for accepted ones to finish.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    /// Shut down on Ctrl-C or SIGTERM.
    ///
    /// A second signal while accepted jobs are still draining exits the
    /// process immediately with status 130.
    ///
    /// Must be called inside a Tokio runtime. Returns `false` if the hooks
    /// were already registered for this coordinator.
    pub fn register_shutdown_hooks(self: &Arc<Self>) -> bool {
        if self.hooks_registered.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown hooks already registered");
            return false;
        }

        let coordinator = Arc::downgrade(self);
        tokio::spawn(async move {
            shutdown_signal().await;
            let Some(coordinator) = coordinator.upgrade() else {
                return;
            };
            let drained = drain_unless_interrupted(coordinator.shutdown(), shutdown_signal()).await;
            if drained == Drain::Interrupted {
                tracing::warn!(
                    in_flight = coordinator.pool.stats().in_flight,
                    "Second signal received, exiting without waiting for jobs"
                );
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        });
        true
    }

    async fn degrade(&self, job: &RenderJob) -> Result<Artifact, RenderError> {
        let fallback = self.fallback.clone();
        let content = job.content.clone();
        let job_id = job.job_id.clone();
        let result = tokio::task::spawn_blocking(move || fallback.render_degraded(&content, &job_id))
            .await
            .unwrap_or_else(|e| Err(FallbackError::Panic(e.to_string())));

        RenderAttempt {
            job_id: &job.job_id,
            renderer: ProducedBy::Fallback,
            attempt_number: 1,
            outcome: if result.is_ok() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Error
            },
            artifact_path: result.as_ref().ok().map(|a| a.path.as_path()),
        }
        .log();

        result.map_err(|source| {
            tracing::error!(job_id = %job.job_id, error = %source, "Rendering failed entirely");
            RenderError::Unrecoverable {
                job_id: job.job_id.clone(),
                source,
            }
        })
    }
}

/// Logs one primary attempt when it finishes.
///
/// The pool drops an attempt's future when it times out, so an attempt that
/// never finishes is logged as a timeout.
struct AttemptRecord<'a> {
    job_id: &'a str,
    attempt: u32,
    finished: bool,
}

impl<'a> AttemptRecord<'a> {
    fn start(job_id: &'a str, attempt: u32) -> Self {
        Self {
            job_id,
            attempt,
            finished: false,
        }
    }

    fn finish(mut self, result: &Result<Artifact, TaskError>) {
        self.finished = true;
        let (outcome, artifact_path) = match result {
            Ok(artifact) => (AttemptOutcome::Success, Some(artifact.path.as_path())),
            Err(_) => (AttemptOutcome::Error, None),
        };
        self.log(outcome, artifact_path);
    }

    fn log(&self, outcome: AttemptOutcome, artifact_path: Option<&Path>) {
        RenderAttempt {
            job_id: self.job_id,
            renderer: ProducedBy::Primary,
            attempt_number: self.attempt,
            outcome,
            artifact_path,
        }
        .log();
    }
}

impl Drop for AttemptRecord<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.log(AttemptOutcome::Timeout, None);
        }
    }
}

/// Conventional exit status after SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    Completed,
    Interrupted,
}

async fn drain_unless_interrupted(
    drain: impl Future<Output = ()>,
    interrupt: impl Future<Output = ()>,
) -> Drain {
    tokio::select! {
        _ = drain => Drain::Completed,
        _ = interrupt => Drain::Interrupted,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down renderer...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down renderer...");
        },
    }
}
