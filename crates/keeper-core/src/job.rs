//! Job definitions: what to sync, where to, and when.
//!
//! A [`JobSpec`] is owned by the configuration and treated as immutable for
//! the duration of a run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Default SSH port; a destination on this port gets no `-p` option.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Transfer mechanism used to reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Rsync,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Rsync => "rsync",
        }
    }
}

/// One local location to sync, with optional include/exclude filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl Source {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Remote end of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default, rename = "type")]
    pub kind: TransportKind,
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    pub path: String,
    /// Identity file passed to ssh with `-i`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
    /// 0 means "not set" (ssh default).
    #[serde(default)]
    pub port: u16,
}

/// A configured sync job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub sources: Vec<Source>,
    pub destination: Destination,
    /// Cron expression; empty means the job only runs on demand.
    #[serde(default)]
    pub schedule: String,
    /// Bandwidth cap handed to the tool as-is (e.g. "500k"). "" or "0" = no cap.
    #[serde(default)]
    pub bandwidth: String,
    /// Delete files on the destination that no longer exist at the source.
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub compress: bool,
    /// Additional options appended verbatim after the generated ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

/// Why a job definition is not runnable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobSpecError {
    #[error("job name cannot be empty")]
    EmptyName,
    #[error("job {0:?}: at least one source required")]
    NoSources(String),
    #[error("job {0:?}: source path cannot be empty")]
    EmptySourcePath(String),
    #[error("job {0:?}: destination host required")]
    MissingHost(String),
    #[error("job {0:?}: destination path required")]
    MissingPath(String),
}

impl JobSpec {
    /// True when the job should be registered with the scheduler.
    pub fn is_scheduled(&self) -> bool {
        !self.schedule.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), JobSpecError> {
        if self.name.trim().is_empty() {
            return Err(JobSpecError::EmptyName);
        }
        if self.sources.is_empty() {
            return Err(JobSpecError::NoSources(self.name.clone()));
        }
        if self.sources.iter().any(|s| s.path.is_empty()) {
            return Err(JobSpecError::EmptySourcePath(self.name.clone()));
        }
        if self.destination.host.is_empty() {
            return Err(JobSpecError::MissingHost(self.name.clone()));
        }
        if self.destination.path.is_empty() {
            return Err(JobSpecError::MissingPath(self.name.clone()));
        }
        Ok(())
    }

    /// Short "first source (+N more)" label for listings.
    pub fn source_summary(&self) -> String {
        match self.sources.split_first() {
            None => String::new(),
            Some((first, [])) => first.path.clone(),
            Some((first, rest)) => format!("{} (+{} more)", first.path, rest.len()),
        }
    }
}
