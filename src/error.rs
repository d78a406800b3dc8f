use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering engine running on a worker thread.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Engine launch failed: {0}")]
    Launch(String),

    #[error("Transient engine error: {0}")]
    Transient(String),

    #[error("Content error: {0}")]
    Content(String),
}

/// Failure of a single task attempt.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Worker {worker_id} crashed: {reason}")]
    WorkerCrashed { worker_id: usize, reason: String },

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl TaskError {
    /// Whether another attempt on a different worker could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TaskError::Execution(_))
    }
}

impl From<EngineError> for TaskError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Launch(msg) | EngineError::Transient(msg) => TaskError::Transient(msg),
            EngineError::Content(msg) => TaskError::Execution(msg),
        }
    }
}

/// Errors surfaced by the worker pool.
///
/// Cloneable so one initialization outcome can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    #[error("Pool initialization failed: {0}")]
    Initialization(String),

    #[error("Task timed out after {attempts} attempt(s)")]
    TaskTimeout { attempts: u32 },

    #[error("Retries exhausted after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: TaskError },

    #[error("Task execution failed: {0}")]
    TaskExecution(String),

    #[error("Worker pool is shutting down")]
    ShuttingDown,
}

/// Internal faults of the fallback renderer.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Layout error: {0}")]
    Layout(#[from] plain_pages::LayoutError),

    #[error("Fallback renderer panicked: {0}")]
    Panic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned to callers of `RenderCoordinator::submit`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer is shutting down")]
    ShuttingDown,

    #[error("Rendering failed entirely for job {job_id}: {source}")]
    Unrecoverable {
        job_id: String,
        #[source]
        source: FallbackError,
    },
}
