//! Rendering workers.
//!
//! A worker owns one engine instance on a dedicated OS thread and is driven
//! through a command channel. Engines are synchronous and may be slow or
//! crash; keeping each one on its own thread means neither can stall the
//! async runtime or take down a sibling worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use crate::error::{EngineError, TaskError};
use crate::models::PrintOptions;

/// A heavyweight, stateful document engine.
///
/// Created on the worker thread by an [`EngineLauncher`] and never moved off
/// it, so implementations need not be `Send`.
pub trait RenderEngine {
    /// Load a document, replacing any previous one
    fn load(&mut self, content: Arc<str>) -> Result<(), EngineError>;

    /// Block until the loaded content is ready to print
    fn settle(&mut self) -> Result<SettleReport, EngineError>;

    /// Paginate the loaded content and return the PDF bytes
    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError>;

    /// Release engine resources. Called once when the worker stops.
    fn close(&mut self) {}
}

/// Creates engines. Called on the new worker's thread.
pub trait EngineLauncher: Send + Sync + 'static {
    fn launch(&self, worker_id: usize) -> Result<Box<dyn RenderEngine>, EngineError>;
}

/// What the engine found while settling the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettleReport {
    pub blocks: usize,
}

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Command {
    Load { content: Arc<str>, reply: Reply<()> },
    Settle { reply: Reply<SettleReport> },
    Print { options: PrintOptions, reply: Reply<Vec<u8>> },
    Terminate,
}

/// Clears the liveness flag when the worker thread exits, including by panic.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct WorkerInner {
    id: usize,
    commands: mpsc::Sender<Command>,
    alive: Arc<AtomicBool>,
    retired: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap, cloneable handle to a running worker
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<WorkerInner>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.inner.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl WorkerHandle {
    /// Start a worker thread and wait until its engine has launched.
    pub async fn spawn(
        worker_id: usize,
        launcher: Arc<dyn EngineLauncher>,
    ) -> Result<WorkerHandle, EngineError> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let alive = Arc::new(AtomicBool::new(true));

        let thread_alive = alive.clone();
        let thread = std::thread::Builder::new()
            .name(format!("pressroom-worker-{worker_id}"))
            .spawn(move || run_worker(worker_id, launcher, receiver, ready_tx, thread_alive))
            .map_err(|e| EngineError::Launch(format!("failed to spawn worker thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(WorkerHandle {
                inner: Arc::new(WorkerInner {
                    id: worker_id,
                    commands,
                    alive,
                    retired: AtomicBool::new(false),
                    thread: Mutex::new(Some(thread)),
                }),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::Launch(format!(
                "worker {worker_id} exited during launch"
            ))),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// False once the thread has exited or the worker was retired
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst) && !self.inner.retired.load(Ordering::SeqCst)
    }

    pub async fn load(&self, content: Arc<str>) -> Result<(), TaskError> {
        self.request(|reply| Command::Load { content, reply }).await
    }

    pub async fn settle(&self) -> Result<SettleReport, TaskError> {
        self.request(|reply| Command::Settle { reply }).await
    }

    pub async fn print(&self, options: PrintOptions) -> Result<Vec<u8>, TaskError> {
        self.request(|reply| Command::Print { options, reply }).await
    }

    /// Stop accepting work and ask the thread to exit once its current
    /// command is done. Idempotent.
    pub fn retire(&self) {
        if !self.inner.retired.swap(true, Ordering::SeqCst) {
            let _ = self.inner.commands.send(Command::Terminate);
        }
    }

    /// Wait for the worker thread to exit. Only meaningful after `retire`.
    pub async fn join(&self) {
        let thread = self
            .inner
            .thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(thread) = thread {
            let id = self.inner.id;
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => tracing::debug!(worker_id = id, "Worker thread had panicked"),
                Err(e) => tracing::warn!(worker_id = id, error = %e, "Failed to join worker thread"),
            }
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, TaskError> {
        let (reply, response) = oneshot::channel();
        if self.inner.commands.send(make(reply)).is_err() {
            return Err(self.crashed("worker thread is gone"));
        }
        match response.await {
            Ok(result) => result.map_err(TaskError::from),
            Err(_) => Err(self.crashed("worker thread stopped before replying")),
        }
    }

    fn crashed(&self, reason: &str) -> TaskError {
        TaskError::WorkerCrashed {
            worker_id: self.inner.id,
            reason: reason.to_string(),
        }
    }
}

fn run_worker(
    worker_id: usize,
    launcher: Arc<dyn EngineLauncher>,
    commands: mpsc::Receiver<Command>,
    ready: oneshot::Sender<Result<(), EngineError>>,
    alive: Arc<AtomicBool>,
) {
    let _guard = AliveGuard(alive);

    let mut engine = match launcher.launch(worker_id) {
        Ok(engine) => engine,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        // Nobody is waiting for this worker any more.
        engine.close();
        return;
    }

    tracing::debug!(worker_id, "Worker thread started");

    // A dropped reply means the caller gave up (timeout); the result is discarded.
    while let Ok(command) = commands.recv() {
        match command {
            Command::Load { content, reply } => {
                let _ = reply.send(engine.load(content));
            }
            Command::Settle { reply } => {
                let _ = reply.send(engine.settle());
            }
            Command::Print { options, reply } => {
                let _ = reply.send(engine.print(&options));
            }
            Command::Terminate => break,
        }
    }

    engine.close();
    tracing::debug!(worker_id, "Worker thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct EchoEngine {
        content: Option<Arc<str>>,
        closed: Arc<AtomicUsize>,
    }

    impl RenderEngine for EchoEngine {
        fn load(&mut self, content: Arc<str>) -> Result<(), EngineError> {
            self.content = Some(content);
            Ok(())
        }

        fn settle(&mut self) -> Result<SettleReport, EngineError> {
            match self.content.as_deref() {
                Some("panic") => panic!("engine blew up"),
                Some(_) => Ok(SettleReport { blocks: 1 }),
                None => Err(EngineError::Content("nothing loaded".to_string())),
            }
        }

        fn print(&mut self, _options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
            Ok(self.content.as_deref().unwrap_or("").as_bytes().to_vec())
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct EchoLauncher {
        closed: Arc<AtomicUsize>,
        fail: bool,
    }

    impl EngineLauncher for EchoLauncher {
        fn launch(&self, _worker_id: usize) -> Result<Box<dyn RenderEngine>, EngineError> {
            if self.fail {
                return Err(EngineError::Launch("no engine binary".to_string()));
            }
            Ok(Box::new(EchoEngine {
                content: None,
                closed: self.closed.clone(),
            }))
        }
    }

    fn launcher(fail: bool) -> (Arc<dyn EngineLauncher>, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(EchoLauncher {
                closed: closed.clone(),
                fail,
            }),
            closed,
        )
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let (launcher, closed) = launcher(false);
        let worker = WorkerHandle::spawn(7, launcher).await.unwrap();
        assert_eq!(worker.id(), 7);

        worker.load(Arc::from("hello")).await.unwrap();
        assert_eq!(worker.settle().await.unwrap().blocks, 1);
        let bytes = worker.print(PrintOptions::default()).await.unwrap();
        assert_eq!(bytes, b"hello");

        worker.retire();
        worker.join().await;
        assert!(!worker.is_alive());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_error_is_task_error() {
        let (launcher, _) = launcher(false);
        let worker = WorkerHandle::spawn(0, launcher).await.unwrap();
        let err = worker.settle().await.unwrap_err();
        assert!(matches!(err, TaskError::Execution(_)));
        assert!(worker.is_alive());
    }

    #[tokio::test]
    async fn test_panic_becomes_worker_crashed() {
        let (launcher, _) = launcher(false);
        let worker = WorkerHandle::spawn(1, launcher).await.unwrap();
        worker.load(Arc::from("panic")).await.unwrap();

        let err = worker.settle().await.unwrap_err();
        assert!(matches!(err, TaskError::WorkerCrashed { worker_id: 1, .. }));

        worker.join().await;
        assert!(!worker.is_alive());
        let err = worker.load(Arc::from("again")).await.unwrap_err();
        assert!(matches!(err, TaskError::WorkerCrashed { .. }));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let (launcher, _) = launcher(true);
        let err = WorkerHandle::spawn(0, launcher).await.unwrap_err();
        assert!(matches!(err, EngineError::Launch(_)));
    }

    #[tokio::test]
    async fn test_retire_is_idempotent() {
        let (launcher, closed) = launcher(false);
        let worker = WorkerHandle::spawn(0, launcher).await.unwrap();
        worker.retire();
        worker.retire();
        worker.join().await;
        worker.join().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
