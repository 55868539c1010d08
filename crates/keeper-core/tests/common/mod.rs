//! Shared fixtures: job builders and a scripted in-process backend.

#![allow(dead_code)]

use async_trait::async_trait;
use keeper_core::backend::{Backend, BackendError, ProgressEvent, ProgressFn, TransferResult};
use keeper_core::job::{Destination, JobSpec, Source};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub fn job(name: &str) -> JobSpec {
    JobSpec {
        name: name.to_string(),
        sources: vec![Source::new("/data/docs")],
        destination: Destination {
            host: "nas.local".to_string(),
            user: "backup".to_string(),
            path: "/srv/backups".to_string(),
            ..Destination::default()
        },
        ..JobSpec::default()
    }
}

pub fn scheduled(name: &str, schedule: &str) -> JobSpec {
    JobSpec {
        schedule: schedule.to_string(),
        ..job(name)
    }
}

/// What [`FakeBackend::run`] does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Report `files` transferred files and succeed.
    Succeed { files: u64, bytes: u64 },
    /// Finish with the given error lines.
    Fail(Vec<String>),
    /// Wait until cancelled.
    Block,
    /// Take `secs` seconds, then succeed with one file. Honors cancellation.
    Slow { secs: u64 },
    /// Reject the job in `validate`.
    Invalid,
}

pub struct FakeBackend {
    script: Script,
    pub validations: AtomicUsize,
    pub runs: AtomicUsize,
    /// Notified when a run starts.
    pub started: Notify,
}

impl FakeBackend {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            validations: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            started: Notify::new(),
        })
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn validation_count(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn validate(&self, _job: &JobSpec) -> Result<(), BackendError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Invalid => Err(BackendError::MissingHost),
            _ => Ok(()),
        }
    }

    async fn run(
        &self,
        _job: &JobSpec,
        _dry_run: bool,
        cancel: &CancellationToken,
        mut on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TransferResult, BackendError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        let mut result = TransferResult::started();
        match &self.script {
            Script::Succeed { files, bytes } => {
                for i in 1..=*files {
                    if let Some(f) = on_progress.as_mut() {
                        f(ProgressEvent::transferring(format!("file-{i}"), i));
                    }
                }
                if let Some(f) = on_progress.as_mut() {
                    f(ProgressEvent::done());
                }
                result.files_transferred = *files;
                result.bytes_transferred = *bytes;
            }
            Script::Fail(errors) => result.errors.extend(errors.iter().cloned()),
            Script::Block => {
                cancel.cancelled().await;
                return Err(BackendError::Cancelled);
            }
            Script::Slow { secs } => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(BackendError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_secs(*secs)) => {}
                }
                result.files_transferred = 1;
            }
            Script::Invalid => unreachable!("validate rejects this script"),
        }
        result.finish();
        Ok(result)
    }
}
