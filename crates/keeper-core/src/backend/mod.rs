//! Transfer backends.
//!
//! A backend turns a [`JobSpec`] into subprocess invocations of an external
//! sync tool, interprets the tool's output, and reports a [`TransferResult`].
//! The tool itself is a black box: nothing here copies or checksums files.

mod error;
pub mod rsync;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::job::{JobSpec, TransportKind};

pub use error::BackendError;
pub use rsync::RsyncBackend;

/// Outcome of one backend invocation (all sources of one job).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub files_total: u64,
    pub files_transferred: u64,
    pub bytes_total: u64,
    pub bytes_transferred: u64,
    pub errors: Vec<String>,
    /// True iff `errors` is empty once every source has been attempted.
    pub success: bool,
}

impl TransferResult {
    /// Empty result starting now.
    pub fn started() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            completed_at: now,
            files_total: 0,
            files_transferred: 0,
            bytes_total: 0,
            bytes_transferred: 0,
            errors: Vec::new(),
            success: false,
        }
    }

    /// Stamp completion time and derive `success` from the error list.
    pub fn finish(&mut self) {
        self.completed_at = Utc::now();
        self.success = self.errors.is_empty();
    }

    /// A failed result carrying only `message` (used when a job could not run at all).
    pub fn failed(message: impl Into<String>) -> Self {
        let mut result = Self::started();
        result.errors.push(message.into());
        result.finish();
        result
    }

    pub fn duration(&self) -> std::time::Duration {
        (self.completed_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Stage reported by a [`ProgressEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transferring,
    /// Flush signal after a source finishes; carries no file data.
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Transferring => "transferring",
            Phase::Done => "done",
        }
    }
}

/// Live progress for observers (CLI spinner, dashboard). Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current_file: String,
    /// Files seen so far in this run.
    pub files_count: u64,
    pub phase: Phase,
}

impl ProgressEvent {
    pub fn transferring(current_file: impl Into<String>, files_count: u64) -> Self {
        Self {
            current_file: current_file.into(),
            files_count,
            phase: Phase::Transferring,
        }
    }

    pub fn done() -> Self {
        Self {
            current_file: String::new(),
            files_count: 0,
            phase: Phase::Done,
        }
    }
}

/// Progress callback. Invoked synchronously from the output reader, so it
/// must return quickly or the subprocess stalls on a full pipe.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(ProgressEvent) + Send);

#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check preconditions before anything is launched.
    fn validate(&self, job: &JobSpec) -> Result<(), BackendError>;

    /// Sync every source of `job`, one after another.
    ///
    /// Per-source failures are collected into the result; only cancellation
    /// produces `Err`, in which case partial counters are discarded.
    async fn run(
        &self,
        job: &JobSpec,
        dry_run: bool,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TransferResult, BackendError>;
}

/// Backend for a destination's transport.
pub fn for_transport(kind: TransportKind) -> Arc<dyn Backend> {
    match kind {
        TransportKind::Rsync => Arc::new(RsyncBackend::new()),
    }
}
