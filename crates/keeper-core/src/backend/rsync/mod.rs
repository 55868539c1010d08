//! rsync backend: one `rsync` subprocess per source, output parsed as it streams.

pub mod args;
pub mod classify;
pub mod exit;

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{Backend, BackendError, ProgressEvent, ProgressFn, TransferResult};
use crate::job::{JobSpec, Source};

use self::classify::LineKind;

/// Counters carried across the sources of one run.
struct RunState<'p> {
    result: TransferResult,
    /// Files seen so far, across all sources.
    files_count: u64,
    on_progress: Option<ProgressFn<'p>>,
}

#[derive(Debug, Clone)]
pub struct RsyncBackend {
    program: PathBuf,
}

impl Default for RsyncBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RsyncBackend {
    pub fn new() -> Self {
        Self::with_program("rsync")
    }

    /// Use a specific executable instead of `rsync` from PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Run one source to completion. Launch and exit failures are recorded
    /// in the run's result; only cancellation returns `Err`.
    async fn sync_source(
        &self,
        job: &JobSpec,
        source: &Source,
        dry_run: bool,
        cancel: &CancellationToken,
        run: &mut RunState<'_>,
    ) -> Result<(), BackendError> {
        let src = args::source_arg(source);
        let dest = args::build_destination(&job.destination);
        let argv = args::build_args(job, source, dry_run);

        tracing::info!(
            job = %job.name,
            source = %src,
            dest = %dest,
            dry_run,
            "executing rsync"
        );

        let mut child = match Command::new(&self.program)
            .args(&argv)
            .arg(&src)
            .arg(&dest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                run.result.errors.push(format!("failed to start rsync: {e}"));
                return Ok(());
            }
        };

        let Some(stdout) = child.stdout.take() else {
            run.result.errors.push("pipe error: rsync stdout not captured".to_string());
            let _ = child.kill().await;
            return Ok(());
        };

        // Drain stderr concurrently so a chatty remote can't fill the pipe.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let mut raw = Vec::new();
                if stderr.read_to_end(&mut raw).await.is_ok() {
                    buf = String::from_utf8_lossy(&raw).into_owned();
                }
            }
            buf
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    stderr_task.abort();
                    tracing::warn!(job = %job.name, source = %src, "rsync cancelled");
                    return Err(BackendError::Cancelled);
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };
            match read {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    tracing::debug!(out = %line, "rsync");
                    match classify::classify(line) {
                        LineKind::Stat(kind, value) => classify::apply_stat(&mut run.result, kind, value),
                        LineKind::FileTransfer => {
                            run.files_count += 1;
                            if let Some(f) = run.on_progress.as_mut() {
                                f(ProgressEvent::transferring(line, run.files_count));
                            }
                        }
                        LineKind::Ignorable => {}
                    }
                }
                Err(e) => {
                    run.result.errors.push(format!("reading rsync output: {e}"));
                    break;
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(BackendError::Cancelled);
            }
            status = child.wait() => status,
        };
        let stderr_output = stderr_task.await.unwrap_or_default();

        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                let code = status.code().unwrap_or(exit::SIGNALLED);
                tracing::warn!(job = %job.name, source = %src, code, "rsync failed");
                run.result
                    .errors
                    .extend(exit::describe_failure(code, stderr_output.trim()));
            }
            Err(e) => run.result.errors.push(format!("waiting for rsync: {e}")),
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for RsyncBackend {
    fn name(&self) -> &'static str {
        "rsync"
    }

    fn validate(&self, job: &JobSpec) -> Result<(), BackendError> {
        if which::which(&self.program).is_err() {
            return Err(BackendError::ToolNotFound {
                program: self.program_name(),
            });
        }
        if job.destination.host.is_empty() {
            return Err(BackendError::MissingHost);
        }
        if job.destination.path.is_empty() {
            return Err(BackendError::MissingPath);
        }
        if job.sources.is_empty() {
            return Err(BackendError::NoSources);
        }
        if job.sources.iter().any(|s| s.path.is_empty()) {
            return Err(BackendError::EmptySourcePath);
        }
        Ok(())
    }

    async fn run(
        &self,
        job: &JobSpec,
        dry_run: bool,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TransferResult, BackendError> {
        let mut run = RunState {
            result: TransferResult::started(),
            files_count: 0,
            on_progress,
        };

        // Sources run in declared order.
        for source in &job.sources {
            self.sync_source(job, source, dry_run, cancel, &mut run).await?;
            if let Some(f) = run.on_progress.as_mut() {
                f(ProgressEvent::done());
            }
        }

        run.result.finish();
        Ok(run.result)
    }
}
