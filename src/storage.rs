//! Run history persistence
//!
//! Completed sessions are written as one JSON file per run, named after the
//! start time, in a single directory.

use crate::error::StorageError;
use crate::record::SessionRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FILE_PREFIX: &str = "run.";
const FILE_SUFFIX: &str = ".json";

/// Receives finalized session records
pub trait RecordSink {
    fn persist(&mut self, record: &SessionRecord) -> Result<(), StorageError>;
}

/// Directory of `run.<startTime>.json` files
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

/// Stored run plus the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub path: PathBuf,
    pub record: SessionRecord,
}

impl RunStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|_| StorageError::DirectoryUnavailable {
            path: root.clone(),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(started_at: i64) -> String {
        format!("{}{}{}", FILE_PREFIX, started_at, FILE_SUFFIX)
    }

    fn is_run_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
            .unwrap_or(false)
    }

    /// Write `record`, replacing any earlier file for the same start time
    pub fn save(&self, record: &SessionRecord) -> Result<PathBuf, StorageError> {
        let path = self.root.join(Self::file_name(record.started_at));
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), "Run saved");
        Ok(path)
    }

    pub fn load(&self, started_at: i64) -> Result<SessionRecord, StorageError> {
        let path = self.root.join(Self::file_name(started_at));
        if !path.exists() {
            return Err(StorageError::NotFound {
                key: Self::file_name(started_at),
            });
        }
        Self::read_file(&path)
    }

    pub fn read_file(path: &Path) -> Result<SessionRecord, StorageError> {
        let content = fs::read_to_string(path)?;
        SessionRecord::from_json(&content).map_err(|e| StorageError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Most recent runs first; unreadable files are skipped
    pub fn list(&self, limit: usize) -> Result<Vec<StoredRun>, StorageError> {
        let mut runs = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !Self::is_run_file(&path) {
                continue;
            }

            match Self::read_file(&path) {
                Ok(record) => runs.push(StoredRun { path, record }),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run file"),
            }
        }

        runs.sort_by(|a, b| b.record.started_at.cmp(&a.record.started_at));
        runs.truncate(limit);
        debug!(count = runs.len(), "Listed stored runs");
        Ok(runs)
    }

    pub fn latest(&self) -> Result<Option<StoredRun>, StorageError> {
        Ok(self.list(1)?.into_iter().next())
    }

    /// Flag a stored run as fetched by the sync client
    pub fn mark_synced(&self, started_at: i64) -> Result<SessionRecord, StorageError> {
        let mut record = self.load(started_at)?;
        if !record.synced {
            record.synced = true;
            self.save(&record)?;
        }
        Ok(record)
    }

    /// Delete every stored run, returning how many were removed
    pub fn clear(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if Self::is_run_file(&path) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(removed, "Cleared stored runs");
        Ok(removed)
    }
}

impl RecordSink for RunStore {
    fn persist(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        self.save(record).map(|_| ())
    }
}
