use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use super::RunRecord;

pub const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("create history dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("open history file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encode run record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only JSON-lines history file.
///
/// Writers in other processes are not coordinated; each record is written
/// with a single `write` on an `O_APPEND` handle.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    failed_appends: AtomicU64,
}

impl HistoryStore {
    /// `history.jsonl` under the XDG data dir.
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::at(crate::config::data_dir()?.join(HISTORY_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            failed_appends: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort append. A failure is logged and counted in
    /// [`failed_appends`](Self::failed_appends), never returned.
    pub fn append(&self, record: &RunRecord) {
        if let Err(e) = self.try_append(record) {
            self.failed_appends.fetch_add(1, Ordering::Relaxed);
            tracing::error!(job = %record.job_name, error = %e, "history append failed");
        }
    }

    /// Number of [`append`](Self::append) calls that failed since creation.
    pub fn failed_appends(&self) -> u64 {
        self.failed_appends.load(Ordering::Relaxed)
    }

    pub fn try_append(&self, record: &RunRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| HistoryError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| HistoryError::Open {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(&line).map_err(|source| HistoryError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Every decodable record in file order. A missing file yields none.
    pub fn load_all(&self) -> Vec<RunRecord> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "cannot read history");
                }
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else {
                tracing::debug!(line = idx + 1, "unreadable history line");
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunRecord>(&line) {
                Ok(r) => records.push(r),
                Err(e) => tracing::debug!(line = idx + 1, error = %e, "skipping bad history line"),
            }
        }
        records
    }

    /// Records for one job, most recent first. `limit == 0` means all.
    pub fn job_records(&self, job_name: &str, limit: usize) -> Vec<RunRecord> {
        let iter = self
            .load_all()
            .into_iter()
            .rev()
            .filter(|r| r.job_name == job_name);
        if limit == 0 {
            iter.collect()
        } else {
            iter.take(limit).collect()
        }
    }

    /// The `limit` most recent records across all jobs, most recent first.
    pub fn recent_records(&self, limit: usize) -> Vec<RunRecord> {
        self.load_all().into_iter().rev().take(limit).collect()
    }
}
