//! Atomic placement of finished PDFs in the output directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::models::{Artifact, ProducedBy};

const MAX_STEM_LEN: usize = 100;
/// Give up on finding a free name after this many collisions
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Writes artifacts into one directory. Never deletes or overwrites files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` as `{job_id}.{kind}.pdf`, or `{job_id}.{kind}.{n}.pdf`
    /// if that name is taken.
    ///
    /// Duplicates end in a number where first names end in the kind, so a
    /// job's first name is never taken by another job's duplicate.
    pub fn persist(&self, job_id: &str, kind: ProducedBy, bytes: &[u8]) -> io::Result<Artifact> {
        Self::persist_in(&self.dir, job_id, kind, bytes)
    }

    /// Same as [`ArtifactStore::persist`] for an arbitrary directory.
    pub fn persist_in(
        dir: &Path,
        job_id: &str,
        kind: ProducedBy,
        bytes: &[u8],
    ) -> io::Result<Artifact> {
        fs::create_dir_all(dir)?;

        // Complete the file under a temporary name so readers never see a
        // partial artifact.
        let mut file = tempfile::Builder::new()
            .prefix(".pressroom-")
            .suffix(".part")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;

        let stem = sanitize_job_id(job_id);
        let mut attempt = 1;
        loop {
            let path = dir.join(artifact_name(&stem, attempt, kind));
            match file.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::debug!(path = %path.display(), size = bytes.len(), "Artifact written");
                    return Ok(Artifact {
                        path,
                        produced_by: kind,
                        size_bytes: bytes.len() as u64,
                    });
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    if attempt >= MAX_NAME_ATTEMPTS {
                        return Err(e.error);
                    }
                    file = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(e.error),
            }
        }
    }
}

fn artifact_name(stem: &str, attempt: u32, kind: ProducedBy) -> String {
    if attempt == 1 {
        format!("{stem}.{kind}.pdf")
    } else {
        format!("{stem}.{kind}.{attempt}.pdf")
    }
}

/// Reduce a job id to a safe file stem.
pub fn sanitize_job_id(job_id: &str) -> String {
    let mut stem: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    if stem.starts_with('.') {
        stem.replace_range(..1, "_");
    }
    if stem.is_empty() {
        stem.push_str("job");
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn file_name(artifact: &Artifact) -> String {
        artifact
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_persist_names_by_job_and_kind() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let artifact = store.persist("job-1", ProducedBy::Primary, b"%PDF-1.7").unwrap();
        assert_eq!(file_name(&artifact), "job-1.primary.pdf");
        assert_eq!(artifact.size_bytes, 8);
        assert_eq!(fs::read(&artifact.path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_repeated_job_id_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let first = store.persist("job-1", ProducedBy::Fallback, b"one").unwrap();
        let second = store.persist("job-1", ProducedBy::Fallback, b"two").unwrap();
        let third = store.persist("job-1", ProducedBy::Fallback, b"three").unwrap();

        assert_eq!(file_name(&first), "job-1.fallback.pdf");
        assert_eq!(file_name(&second), "job-1.fallback.2.pdf");
        assert_eq!(file_name(&third), "job-1.fallback.3.pdf");
        assert_eq!(fs::read(&first.path).unwrap(), b"one");
        assert_eq!(fs::read(&second.path).unwrap(), b"two");
    }

    #[test]
    fn test_dotted_job_id_keeps_its_own_name() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        store.persist("a", ProducedBy::Primary, b"one").unwrap();
        let duplicate = store.persist("a", ProducedBy::Primary, b"two").unwrap();
        let dotted = store.persist("a.2", ProducedBy::Primary, b"three").unwrap();
        let repeat = store.persist("a.primary", ProducedBy::Primary, b"four").unwrap();

        assert_eq!(file_name(&duplicate), "a.primary.2.pdf");
        assert_eq!(file_name(&dotted), "a.2.primary.pdf");
        assert_eq!(file_name(&repeat), "a.primary.primary.pdf");
        assert_eq!(fs::read(&dotted.path).unwrap(), b"three");
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.persist("a", ProducedBy::Primary, b"x").unwrap();
        store.persist("a", ProducedBy::Primary, b"y").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with(".part")));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("pdf");
        let artifact = ArtifactStore::persist_in(&nested, "j", ProducedBy::Primary, b"x").unwrap();
        assert!(artifact.path.starts_with(&nested));
    }

    #[test]
    fn test_sanitize_job_id() {
        assert_eq!(sanitize_job_id("job-1"), "job-1");
        assert_eq!(sanitize_job_id("../etc/passwd"), "_._etc_passwd");
        assert_eq!(sanitize_job_id("a b/c"), "a_b_c");
        assert_eq!(sanitize_job_id(""), "job");
        assert_eq!(sanitize_job_id("日本"), "__");
        assert_eq!(sanitize_job_id(&"x".repeat(500)).len(), MAX_STEM_LEN);
    }
}
