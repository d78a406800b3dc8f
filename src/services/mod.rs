pub mod artifact_store;
pub mod coordinator;
pub mod fallback;
pub mod primary;
pub mod worker;
pub mod worker_pool;

pub use artifact_store::ArtifactStore;
pub use coordinator::RenderCoordinator;
pub use fallback::{FallbackRenderer, DEGRADED_BANNER};
pub use primary::PrimaryRenderer;
pub use worker::{EngineLauncher, RenderEngine, SettleReport, WorkerHandle};
pub use worker_pool::{PoolEvent, PoolStats, PoolStatus, TaskContext, WorkerPool};
