use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::page_spec::{Margins, PageSpec, PrintOptions};

/// Application configuration loaded from config.yaml
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Worker pool sizing and limits
    #[serde(default)]
    pub pool: PoolConfig,

    /// Where artifacts are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Page layout for the primary renderer
    #[serde(default)]
    pub page: PageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of rendering workers
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Deadline for a single task attempt
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Deadline for launching one worker
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_capacity() -> usize {
    2
}

fn default_task_timeout_ms() -> u64 {
    60_000
}

fn default_retry_limit() -> u32 {
    3
}

fn default_startup_timeout_ms() -> u64 {
    30_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            task_timeout_ms: default_task_timeout_ms(),
            retry_limit: default_retry_limit(),
            startup_timeout_ms: default_startup_timeout_ms(),
        }
    }
}

impl PoolConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct OutputConfig {
    /// Output directory (defaults to `<system temp>/pressroom`)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl OutputConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pressroom"))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PageConfig {
    /// Page size name: a4, a5, letter or legal
    #[serde(default = "default_page_size")]
    pub size: String,

    #[serde(default)]
    pub margins: Margins,

    #[serde(default = "default_header")]
    pub header: Option<String>,

    #[serde(default = "default_footer")]
    pub footer: Option<String>,
}

fn default_page_size() -> String {
    "a4".to_string()
}

fn default_header() -> Option<String> {
    Some("{title}".to_string())
}

fn default_footer() -> Option<String> {
    Some("Page {page} of {pages}".to_string())
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: default_page_size(),
            margins: Margins::default(),
            header: default_header(),
            footer: default_footer(),
        }
    }
}

impl PageConfig {
    /// Resolve the page size; unknown names fall back to A4
    pub fn page_spec(&self) -> PageSpec {
        PageSpec::from_name(&self.size).unwrap_or_else(|| {
            tracing::warn!(size = %self.size, "Unknown page size, using a4");
            PageSpec::A4
        })
    }

    pub fn print_options(&self) -> PrintOptions {
        PrintOptions {
            page: self.page_spec(),
            margins: self.margins,
            header: self.header.clone().filter(|h| !h.is_empty()),
            footer: self.footer.clone().filter(|f| !f.is_empty()),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, applying environment overrides.
    ///
    /// A missing or unparsable file is logged and replaced by defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let config = match path {
            None => Self::default(),
            Some(path) => match std::fs::read_to_string(path) {
                Ok(content) => match Self::from_yaml_str(&content) {
                    Ok(config) => {
                        tracing::info!(
                            path = %path.display(),
                            capacity = config.pool.capacity,
                            task_timeout_ms = config.pool.task_timeout_ms,
                            "Loaded configuration"
                        );
                        config
                    }
                    Err(e) => {
                        tracing::warn!(%e, path = %path.display(), "Failed to parse config, using defaults");
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::warn!(%e, path = %path.display(), "Failed to read config, using defaults");
                    Self::default()
                }
            },
        };

        config.with_env_overrides()
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config.normalized())
    }

    /// Apply `OUTPUT_DIR` if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os("OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.output.dir = Some(PathBuf::from(dir));
        }
        self.normalized()
    }

    /// Clamp values that would leave the pool unusable
    pub fn normalized(mut self) -> Self {
        if self.pool.capacity == 0 {
            tracing::warn!("Pool capacity 0 is not usable, clamping to 1");
            self.pool.capacity = 1;
        }
        self
    }
}
