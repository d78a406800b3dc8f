//! Bounded pool of rendering workers.
//!
//! The pool is created cold and starts its workers on first use. Tasks beyond
//! capacity wait on a fair semaphore, each attempt runs under the task
//! timeout, and transient failures are retried on a fresh checkout.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{broadcast, Notify, Semaphore};

use crate::error::{EngineError, PoolError, TaskError};
use crate::models::PoolConfig;

use super::worker::{EngineLauncher, WorkerHandle};

type InitFuture = Shared<BoxFuture<'static, Result<(), PoolError>>>;

/// What a task attempt gets to work with
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub worker: WorkerHandle,
    /// 1-based attempt number
    pub attempt: u32,
}

/// Events broadcast to pool subscribers
#[derive(Debug, Clone)]
pub enum PoolEvent {
    TaskError {
        job_id: String,
        attempt: u32,
        error: TaskError,
    },
    WorkerLaunched {
        worker_id: usize,
    },
    WorkerRecycled {
        worker_id: usize,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub status: PoolStatus,
    pub capacity: usize,
    /// Attempts currently holding a worker
    pub active_tasks: usize,
    /// Accepted tasks, queued or running
    pub in_flight: usize,
    pub idle_workers: usize,
    pub init_attempts: u64,
    pub workers_launched: u64,
    pub workers_recycled: u64,
    /// Highest `active_tasks` ever observed
    pub peak_active: usize,
}

enum Lifecycle {
    Uninitialized,
    Initializing(InitFuture),
    Ready,
    Terminated,
}

struct PoolState {
    lifecycle: Lifecycle,
    draining: bool,
    idle: Vec<WorkerHandle>,
}

struct PoolInner {
    capacity: usize,
    task_timeout: Duration,
    startup_timeout: Duration,
    retry_limit: u32,
    launcher: Arc<dyn EngineLauncher>,
    state: Mutex<PoolState>,
    permits: Semaphore,
    active: AtomicUsize,
    peak_active: AtomicUsize,
    in_flight: AtomicUsize,
    drained: Notify,
    events: broadcast::Sender<PoolEvent>,
    init_attempts: AtomicU64,
    workers_launched: AtomicU64,
    workers_recycled: AtomicU64,
    next_worker_id: AtomicUsize,
}

/// Shared handle to a worker pool. Clones refer to the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(config: &PoolConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        let capacity = config.capacity.max(1);
        let (events, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(PoolInner {
                capacity,
                task_timeout: config.task_timeout(),
                startup_timeout: config.startup_timeout(),
                retry_limit: config.retry_limit,
                launcher,
                state: Mutex::new(PoolState {
                    lifecycle: Lifecycle::Uninitialized,
                    draining: false,
                    idle: Vec::with_capacity(capacity),
                }),
                permits: Semaphore::new(capacity),
                active: AtomicUsize::new(0),
                peak_active: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
                events,
                init_attempts: AtomicU64::new(0),
                workers_launched: AtomicU64::new(0),
                workers_recycled: AtomicU64::new(0),
                next_worker_id: AtomicUsize::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Subscribe to task errors and worker lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    /// Start the workers if that has not happened yet.
    ///
    /// Concurrent callers share a single attempt. A failed attempt leaves the
    /// pool uninitialized so the next call starts over.
    pub async fn init(&self) -> Result<(), PoolError> {
        match self.pending_init(true)? {
            Some(pending) => pending.await,
            None => Ok(()),
        }
    }

    /// Run `work` on a pooled worker, retrying transient failures.
    ///
    /// `work` is called once per attempt with a freshly checked-out worker.
    pub async fn execute<T, F, Fut>(&self, job_id: &str, work: F) -> Result<T, PoolError>
    where
        F: Fn(TaskContext) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let _ticket = self.admit()?;

        // Tasks admitted before shutdown may still bring the pool up.
        if let Some(pending) = self.pending_init(false)? {
            pending.await?;
        }

        let max_attempts = self.inner.retry_limit.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match self.run_attempt(attempt, &work).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            tracing::warn!(
                job_id,
                attempt,
                max_attempts,
                error = %error,
                "Task attempt failed"
            );
            let _ = self.inner.events.send(PoolEvent::TaskError {
                job_id: job_id.to_string(),
                attempt,
                error: error.clone(),
            });

            if !error.is_retryable() {
                return Err(PoolError::TaskExecution(match error {
                    TaskError::Execution(message) => message,
                    other => other.to_string(),
                }));
            }
            if attempt >= max_attempts {
                return Err(match error {
                    TaskError::Timeout(_) => PoolError::TaskTimeout { attempts: attempt },
                    last => PoolError::RetriesExhausted {
                        attempts: attempt,
                        last,
                    },
                });
            }
        }
    }

    /// Stop accepting work, wait for accepted tasks, then stop all workers.
    ///
    /// Safe to call more than once and from several places at once.
    pub async fn shutdown(&self) {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.draining, true)
        };
        if first {
            tracing::info!(
                in_flight = self.inner.in_flight.load(Ordering::SeqCst),
                "Shutting down worker pool"
            );
        }

        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }

        let pending = match &self.lock().lifecycle {
            Lifecycle::Initializing(pending) => Some(pending.clone()),
            _ => None,
        };
        if let Some(pending) = pending {
            let _ = pending.await;
        }

        let idle = {
            let mut state = self.lock();
            state.lifecycle = Lifecycle::Terminated;
            std::mem::take(&mut state.idle)
        };
        for worker in &idle {
            worker.retire();
        }
        for worker in &idle {
            worker.join().await;
        }

        if first {
            tracing::info!(workers = idle.len(), "Worker pool shut down");
        }
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.lock();
        if state.draining {
            return PoolStatus::ShuttingDown;
        }
        match state.lifecycle {
            Lifecycle::Uninitialized => PoolStatus::Uninitialized,
            Lifecycle::Initializing(_) => PoolStatus::Initializing,
            Lifecycle::Ready => PoolStatus::Ready,
            Lifecycle::Terminated => PoolStatus::ShuttingDown,
        }
    }

    pub fn stats(&self) -> PoolStats {
        let idle_workers = self.lock().idle.len();
        PoolStats {
            status: self.status(),
            capacity: self.inner.capacity,
            active_tasks: self.inner.active.load(Ordering::SeqCst),
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            idle_workers,
            init_attempts: self.inner.init_attempts.load(Ordering::SeqCst),
            workers_launched: self.inner.workers_launched.load(Ordering::SeqCst),
            workers_recycled: self.inner.workers_recycled.load(Ordering::SeqCst),
            peak_active: self.inner.peak_active.load(Ordering::SeqCst),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admit(&self) -> Result<InFlight, PoolError> {
        let state = self.lock();
        if state.draining {
            return Err(PoolError::ShuttingDown);
        }
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(InFlight {
            inner: self.inner.clone(),
        })
    }

    /// The initialization to wait for, starting one if needed.
    fn pending_init(&self, reject_draining: bool) -> Result<Option<InitFuture>, PoolError> {
        let mut state = self.lock();
        if reject_draining && state.draining {
            return Err(PoolError::ShuttingDown);
        }
        match &state.lifecycle {
            Lifecycle::Ready => return Ok(None),
            Lifecycle::Terminated => return Err(PoolError::ShuttingDown),
            Lifecycle::Initializing(pending) => return Ok(Some(pending.clone())),
            Lifecycle::Uninitialized => {}
        }

        // Spawned so the attempt completes even if every waiter goes away.
        let pool = self.clone();
        let task = tokio::spawn(async move { pool.run_init().await });
        let pool = self.clone();
        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    pool.reset_failed_init();
                    Err(PoolError::Initialization(format!(
                        "initialization task failed: {e}"
                    )))
                }
            }
        }
        .boxed()
        .shared();
        state.lifecycle = Lifecycle::Initializing(pending.clone());
        Ok(Some(pending))
    }

    async fn run_init(self) -> Result<(), PoolError> {
        let attempt = self.inner.init_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        tracing::info!(capacity = self.inner.capacity, attempt, "Initializing worker pool");

        let results = join_all((0..self.inner.capacity).map(|_| self.launch_worker())).await;

        let mut workers = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        let outcome = {
            let mut state = self.lock();
            if let Some(e) = failure {
                state.lifecycle = Lifecycle::Uninitialized;
                Err(PoolError::Initialization(e.to_string()))
            } else if matches!(state.lifecycle, Lifecycle::Terminated) {
                Err(PoolError::ShuttingDown)
            } else {
                state.idle.append(&mut workers);
                state.lifecycle = Lifecycle::Ready;
                Ok(())
            }
        };

        // Anything left over was started by a failed attempt.
        for worker in &workers {
            worker.retire();
        }
        for worker in &workers {
            worker.join().await;
        }

        match &outcome {
            Ok(()) => tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Worker pool ready"
            ),
            Err(e) => tracing::error!(
                attempt,
                retired = workers.len(),
                error = %e,
                "Worker pool initialization failed"
            ),
        }
        outcome
    }

    fn reset_failed_init(&self) {
        let mut state = self.lock();
        if matches!(state.lifecycle, Lifecycle::Initializing(_)) {
            state.lifecycle = Lifecycle::Uninitialized;
        }
    }

    async fn launch_worker(&self) -> Result<WorkerHandle, EngineError> {
        let worker_id = self.inner.next_worker_id.fetch_add(1, Ordering::SeqCst);
        let launch = WorkerHandle::spawn(worker_id, self.inner.launcher.clone());

        match tokio::time::timeout(self.inner.startup_timeout, launch).await {
            Ok(Ok(worker)) => {
                self.inner.workers_launched.fetch_add(1, Ordering::SeqCst);
                let _ = self.inner.events.send(PoolEvent::WorkerLaunched { worker_id });
                tracing::debug!(worker_id, "Worker launched");
                Ok(worker)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::Launch(format!(
                "worker {worker_id} did not start within {}ms",
                self.inner.startup_timeout.as_millis()
            ))),
        }
    }

    async fn run_attempt<T, F, Fut>(&self, attempt: u32, work: &F) -> Result<T, TaskError>
    where
        F: Fn(TaskContext) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| TaskError::Transient("worker pool is closed".to_string()))?;
        let _active = ActiveGuard::new(&self.inner);

        let worker = self.checkout().await?;
        let worker_id = worker.id();
        let started = Instant::now();
        let context = TaskContext {
            worker: worker.clone(),
            attempt,
        };

        match tokio::time::timeout(self.inner.task_timeout, work(context)).await {
            Ok(Ok(value)) => {
                tracing::debug!(
                    worker_id,
                    attempt,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Task attempt succeeded"
                );
                self.checkin(worker);
                Ok(value)
            }
            Ok(Err(error)) => {
                if matches!(error, TaskError::WorkerCrashed { .. }) {
                    self.recycle(&worker, "crashed");
                } else {
                    self.checkin(worker);
                }
                Err(error)
            }
            Err(_) => {
                // The engine cannot be interrupted; let it finish and discard it.
                self.recycle(&worker, "timeout");
                Err(TaskError::Timeout(self.inner.task_timeout))
            }
        }
    }

    async fn checkout(&self) -> Result<WorkerHandle, TaskError> {
        loop {
            let candidate = self.lock().idle.pop();
            match candidate {
                Some(worker) if worker.is_alive() => return Ok(worker),
                Some(worker) => self.recycle(&worker, "dead"),
                None => break,
            }
        }

        self.launch_worker().await.map_err(|e| {
            TaskError::Transient(format!("replacement worker failed to start: {e}"))
        })
    }

    fn checkin(&self, worker: WorkerHandle) {
        if !worker.is_alive() {
            self.recycle(&worker, "dead");
            return;
        }
        self.lock().idle.push(worker);
    }

    fn recycle(&self, worker: &WorkerHandle, reason: &'static str) {
        worker.retire();
        self.inner.workers_recycled.fetch_add(1, Ordering::SeqCst);
        let _ = self.inner.events.send(PoolEvent::WorkerRecycled {
            worker_id: worker.id(),
            reason,
        });
        tracing::info!(worker_id = worker.id(), reason, "Worker recycled");
    }
}

/// Counts an accepted task until it finishes
struct InFlight {
    inner: Arc<PoolInner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

struct ActiveGuard<'a> {
    inner: &'a PoolInner,
}

impl<'a> ActiveGuard<'a> {
    fn new(inner: &'a PoolInner) -> Self {
        let active = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        inner.peak_active.fetch_max(active, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}
