//! Test fixtures and constants.

use pressroom::models::{AppConfig, OutputConfig, PoolConfig};
use tempfile::TempDir;

/// The canonical well-formed document
pub const SAMPLE_HTML: &str = "<h1>Title</h1><p>Body</p>";

/// Pool settings with short timeouts suitable for tests
pub fn pool_config(capacity: usize, task_timeout_ms: u64, retry_limit: u32) -> PoolConfig {
    PoolConfig {
        capacity,
        task_timeout_ms,
        retry_limit,
        startup_timeout_ms: 2_000,
    }
}

/// Full configuration writing into `dir`
pub fn app_config(dir: &TempDir, pool: PoolConfig) -> AppConfig {
    AppConfig {
        pool,
        output: OutputConfig {
            dir: Some(dir.path().to_path_buf()),
        },
        ..AppConfig::default()
    }
}
