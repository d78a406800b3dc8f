//! Scripted engines whose behavior is chosen by the document content.
//!
//! | content      | behavior                                         |
//! |--------------|--------------------------------------------------|
//! | `panic`      | panics while settling (kills the worker thread)  |
//! | `slow:N`     | settles after sleeping N milliseconds            |
//! | `stall:N`    | first N settles across all workers hang 300 ms   |
//! | `transient`  | settle always fails with a transient error       |
//! | `flaky`      | first settle across all workers fails, then ok   |
//! | `bad`        | print fails with a content error                 |
//! | anything     | prints a small fake PDF                          |

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pressroom::error::{EngineError, TaskError};
use pressroom::models::PrintOptions;
use pressroom::services::{EngineLauncher, RenderEngine, SettleReport, TaskContext};

const STALL: Duration = Duration::from_millis(300);

/// Counters shared by a launcher and all of its engines
#[derive(Debug, Default)]
pub struct Probe {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub settling: AtomicUsize,
    pub peak_settling: AtomicUsize,
}

impl Probe {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn peak_settling(&self) -> usize {
        self.peak_settling.load(Ordering::SeqCst)
    }
}

pub struct ScriptedLauncher {
    probe: Arc<Probe>,
    launch_delay: Duration,
    failing_launches: AtomicUsize,
    flaky_tripped: Arc<AtomicBool>,
    stalls: Arc<AtomicUsize>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            launch_delay: Duration::ZERO,
            failing_launches: AtomicUsize::new(0),
            flaky_tripped: Arc::new(AtomicBool::new(false)),
            stalls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every launch sleeps this long before returning
    pub fn launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// The first `count` launches fail
    pub fn fail_first_launches(self, count: usize) -> Self {
        self.failing_launches.store(count, Ordering::SeqCst);
        self
    }

    /// Every launch fails
    pub fn always_failing(self) -> Self {
        self.fail_first_launches(usize::MAX)
    }

    pub fn probe(&self) -> Arc<Probe> {
        self.probe.clone()
    }

    pub fn shared(self) -> (Arc<dyn EngineLauncher>, Arc<Probe>) {
        let probe = self.probe();
        (Arc::new(self), probe)
    }
}

impl EngineLauncher for ScriptedLauncher {
    fn launch(&self, worker_id: usize) -> Result<Box<dyn RenderEngine>, EngineError> {
        if !self.launch_delay.is_zero() {
            std::thread::sleep(self.launch_delay);
        }
        let should_fail = self
            .failing_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(EngineError::Launch(format!(
                "scripted launch failure for worker {worker_id}"
            )));
        }

        self.probe.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine {
            probe: self.probe.clone(),
            flaky_tripped: self.flaky_tripped.clone(),
            stalls: self.stalls.clone(),
            content: None,
        }))
    }
}

struct ScriptedEngine {
    probe: Arc<Probe>,
    flaky_tripped: Arc<AtomicBool>,
    stalls: Arc<AtomicUsize>,
    content: Option<Arc<str>>,
}

impl RenderEngine for ScriptedEngine {
    fn load(&mut self, content: Arc<str>) -> Result<(), EngineError> {
        self.content = Some(content);
        Ok(())
    }

    fn settle(&mut self) -> Result<SettleReport, EngineError> {
        let content = self.content.clone().unwrap_or_else(|| Arc::from(""));
        match content.as_ref() {
            "panic" => panic!("scripted engine panic"),
            "transient" => return Err(EngineError::Transient("scripted transient".to_string())),
            "flaky" if !self.flaky_tripped.swap(true, Ordering::SeqCst) => {
                return Err(EngineError::Transient("scripted flake".to_string()));
            }
            _ => {}
        }

        let now = self.probe.settling.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak_settling.fetch_max(now, Ordering::SeqCst);
        if let Some(ms) = content
            .strip_prefix("slow:")
            .and_then(|n| n.trim().parse::<u64>().ok())
        {
            std::thread::sleep(Duration::from_millis(ms));
        }
        if let Some(count) = content
            .strip_prefix("stall:")
            .and_then(|n| n.trim().parse::<usize>().ok())
        {
            if self.stalls.fetch_add(1, Ordering::SeqCst) < count {
                std::thread::sleep(STALL);
            }
        }
        self.probe.settling.fetch_sub(1, Ordering::SeqCst);

        Ok(SettleReport { blocks: 1 })
    }

    fn print(&mut self, _options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        match self.content.as_deref() {
            Some("bad") => Err(EngineError::Content("scripted content failure".to_string())),
            content => Ok(format!("%PDF-1.7\n% scripted: {}\n%%EOF\n", content.unwrap_or("")).into_bytes()),
        }
    }

    fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Load, settle and print `content` on the task's worker
pub async fn print_on(ctx: TaskContext, content: &str) -> Result<Vec<u8>, TaskError> {
    ctx.worker.load(Arc::from(content)).await?;
    ctx.worker.settle().await?;
    ctx.worker.print(PrintOptions::default()).await
}
