pub mod config;
pub mod job;
pub mod page_spec;

pub use config::{AppConfig, OutputConfig, PageConfig, PoolConfig};
pub use job::{
    Artifact, AttemptOutcome, ProducedBy, RenderAttempt, RenderJob, RenderResult,
};
pub use page_spec::{Margins, PageSpec, PrintOptions};
