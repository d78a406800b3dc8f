use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One render request. Content is shared so retries never copy it.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub job_id: String,
    pub content: Arc<str>,
    pub created_at: DateTime<Utc>,
}

impl RenderJob {
    pub fn new(job_id: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        Self {
            job_id: job_id.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Which render path produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducedBy {
    Primary,
    Fallback,
}

impl ProducedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducedBy::Primary => "primary",
            ProducedBy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProducedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished PDF on disk. The caller owns the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub produced_by: ProducedBy,
    pub size_bytes: u64,
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "produced_by", rename_all = "lowercase")]
pub enum RenderResult {
    Primary { artifact: Artifact },
    Fallback { artifact: Artifact, reason: String },
}

impl RenderResult {
    pub fn artifact(&self) -> &Artifact {
        match self {
            RenderResult::Primary { artifact } | RenderResult::Fallback { artifact, .. } => {
                artifact
            }
        }
    }

    pub fn into_artifact(self) -> Artifact {
        match self {
            RenderResult::Primary { artifact } | RenderResult::Fallback { artifact, .. } => {
                artifact
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.artifact().path
    }

    pub fn produced_by(&self) -> ProducedBy {
        match self {
            RenderResult::Primary { .. } => ProducedBy::Primary,
            RenderResult::Fallback { .. } => ProducedBy::Fallback,
        }
    }

    /// Why the primary path was abandoned, if it was
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            RenderResult::Primary { .. } => None,
            RenderResult::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Error,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Timeout => "timeout",
            AttemptOutcome::Error => "error",
        }
    }
}

/// Record of one render attempt, emitted as a log event and not kept
#[derive(Debug, Clone)]
pub struct RenderAttempt<'a> {
    pub job_id: &'a str,
    pub renderer: ProducedBy,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub artifact_path: Option<&'a Path>,
}

impl RenderAttempt<'_> {
    pub fn log(&self) {
        let path = self.artifact_path.map(|p| p.display().to_string());
        match self.outcome {
            AttemptOutcome::Success => tracing::info!(
                job_id = self.job_id,
                renderer = self.renderer.as_str(),
                attempt = self.attempt_number,
                outcome = self.outcome.as_str(),
                artifact_path = path.as_deref(),
                "Render attempt finished"
            ),
            AttemptOutcome::Timeout | AttemptOutcome::Error => tracing::warn!(
                job_id = self.job_id,
                renderer = self.renderer.as_str(),
                attempt = self.attempt_number,
                outcome = self.outcome.as_str(),
                artifact_path = path.as_deref(),
                "Render attempt finished"
            ),
        }
    }
}
