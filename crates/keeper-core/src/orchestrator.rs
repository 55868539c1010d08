//! Runs jobs through their backend with single-flight protection.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{self, Backend, BackendError, ProgressEvent, ProgressFn, TransferResult};
use crate::control::RunRegistry;
use crate::job::JobSpec;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("job {0:?} is already running")]
    AlreadyRunning(String),

    #[error("validation failed: {0}")]
    Validation(#[source] BackendError),

    #[error(transparent)]
    Backend(BackendError),

    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RunError::AlreadyRunning(_))
    }
}

/// Entry point for manual and scheduled runs.
///
/// Backends are resolved from each job's transport unless a fixed backend is
/// injected with [`Orchestrator::with_backend`].
pub struct Orchestrator {
    registry: Arc<RunRegistry>,
    backend: Option<Arc<dyn Backend>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<RunRegistry>) -> Self {
        Self {
            registry,
            backend: None,
        }
    }

    pub fn with_backend(registry: Arc<RunRegistry>, backend: Arc<dyn Backend>) -> Self {
        Self {
            registry,
            backend: Some(backend),
        }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.registry.is_running(name)
    }

    /// Cancel a running job; returns false if it was not running.
    pub fn cancel(&self, name: &str) -> bool {
        self.registry.cancel(name)
    }

    fn backend_for(&self, job: &JobSpec) -> Arc<dyn Backend> {
        match &self.backend {
            Some(b) => Arc::clone(b),
            None => backend::for_transport(job.destination.kind),
        }
    }

    /// Run one job. The job stays registered until this future completes or
    /// is dropped.
    pub async fn run(
        &self,
        job: &JobSpec,
        dry_run: bool,
        parent: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<TransferResult, RunError> {
        let Some(guard) = self.registry.try_register(&job.name, parent) else {
            return Err(RunError::AlreadyRunning(job.name.clone()));
        };

        let backend = self.backend_for(job);
        backend.validate(job).map_err(RunError::Validation)?;

        tracing::info!(job = %job.name, backend = backend.name(), dry_run, "run started");
        let result = backend
            .run(job, dry_run, guard.token(), on_progress)
            .await
            .map_err(|e| match e {
                BackendError::Cancelled => RunError::Cancelled,
                other => RunError::Backend(other),
            })?;

        tracing::info!(
            job = %job.name,
            success = result.success,
            files = result.files_transferred,
            bytes = result.bytes_transferred,
            errors = result.errors.len(),
            "run finished"
        );
        Ok(result)
    }

    /// Run `jobs` one after another in the given order. Errors become failed
    /// results so every job gets an entry.
    pub async fn run_all<F>(
        &self,
        jobs: &[JobSpec],
        dry_run: bool,
        parent: &CancellationToken,
        mut on_progress: F,
    ) -> Vec<(String, TransferResult)>
    where
        F: FnMut(&str, ProgressEvent) + Send,
    {
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            let name = job.name.as_str();
            let mut forward = |ev: ProgressEvent| on_progress(name, ev);
            let progress: ProgressFn<'_> = &mut forward;
            let result = match self.run(job, dry_run, parent, Some(progress)).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(job = %job.name, error = %e, "run failed");
                    TransferResult::failed(e.to_string())
                }
            };
            results.push((job.name.clone(), result));
        }
        results
    }
}
