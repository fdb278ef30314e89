use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CandidateId, CandidateRecord};
use super::evaluation::EvaluationResult;

/// Candidate snapshot, its evaluation, and storage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCandidate {
    pub id: CandidateId,
    pub candidate: CandidateRecord,
    pub evaluation: EvaluationResult,
    pub timestamp: DateTime<Utc>,
}

impl StoredCandidate {
    pub fn display_name(&self) -> String {
        let first = self.candidate.first_name.as_deref().unwrap_or_default();
        let last = self.candidate.last_name.as_deref().unwrap_or_default();
        let name = format!("{first} {last}");
        let name = name.trim();
        if name.is_empty() {
            "(unnamed)".to_string()
        } else {
            name.to_string()
        }
    }
}

/// Reviewer decision applied to a single flag; both fields replace the stored values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagReview {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub overridden: bool,
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("candidate store is shut down")]
    Closed,
}

/// Durable mirror of the candidate collection.
///
/// The whole collection is the unit of persistence: `load` reads all of it,
/// `persist` replaces all of it.
pub trait SnapshotSink: Send + Sync + 'static {
    fn load(&self) -> Result<Vec<StoredCandidate>, RepositoryError>;
    fn persist(&self, records: &[StoredCandidate]) -> Result<(), RepositoryError>;

    /// Preserve unreadable contents before they are overwritten; returns where they went.
    fn set_aside(&self) -> Result<Option<PathBuf>, RepositoryError> {
        Ok(None)
    }
}

/// Pretty-printed JSON array on local disk, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection without writing anything; `None` when the file does not exist.
    pub fn read_existing(&self) -> Result<Option<Vec<StoredCandidate>>, RepositoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.unavailable("read", err)),
        };

        if contents.trim().is_empty() {
            return Ok(Some(Vec::new()));
        }

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| self.unavailable("parse", err))
    }

    fn unavailable(&self, action: &str, err: impl std::fmt::Display) -> RepositoryError {
        RepositoryError::Unavailable(format!("{action} {}: {err}", self.path.display()))
    }

    fn write_atomic(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)
    }
}

impl SnapshotSink for JsonFileSink {
    /// A missing file is initialised with an empty collection.
    fn load(&self) -> Result<Vec<StoredCandidate>, RepositoryError> {
        match self.read_existing()? {
            Some(records) => Ok(records),
            None => {
                debug!(path = %self.path.display(), "creating empty candidate data file");
                self.persist(&[])?;
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, records: &[StoredCandidate]) -> Result<(), RepositoryError> {
        let mut buf =
            serde_json::to_string_pretty(records).map_err(|err| self.unavailable("encode", err))?;
        buf.push('\n');
        self.write_atomic(&buf)
            .map_err(|err| self.unavailable("write", err))
    }

    /// Renames the file to `<name>.json.corrupt-<UTC timestamp>` beside it.
    fn set_aside(&self) -> Result<Option<PathBuf>, RepositoryError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let moved_to = self.path.with_extension(format!("json.corrupt-{stamp}"));
        fs::rename(&self.path, &moved_to).map_err(|err| self.unavailable("set aside", err))?;
        Ok(Some(moved_to))
    }
}
