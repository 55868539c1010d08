//! Scheduler: one tokio task per registered job, sleeping until the job's
//! next occurrence and then running it through the [`Orchestrator`].
//!
//! Lifecycle is `Stopped -> start() -> Running -> stop() -> Stopped`, and a
//! stopped scheduler cannot be restarted. Reloading configuration means
//! building a new instance. `stop` lets runs in flight finish and record
//! their result; `shutdown` cancels them.

use chrono::{DateTime, Local, TimeZone};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::cron::{CronExpr, CronParseError};
use crate::config::KeeperConfig;
use crate::history::{HistoryStore, RunRecord};
use crate::job::JobSpec;
use crate::orchestrator::{Orchestrator, RunError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job {job:?}: invalid schedule {schedule:?}: {source}")]
    InvalidSchedule {
        job: String,
        schedule: String,
        #[source]
        source: CronParseError,
    },

    #[error("job {0:?} has no schedule")]
    NoSchedule(String),

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler has been stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct Entry {
    job: Arc<JobSpec>,
    expr: Arc<CronExpr>,
    /// Ends the entry's wait loop. Runs already in flight are not interrupted.
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    state: SchedulerState,
    /// Set once `stop` has been called.
    finished: bool,
    entries: HashMap<String, Entry>,
    /// Tasks of replaced or removed entries, possibly still finishing a run.
    retired: Vec<JoinHandle<()>>,
}

impl Inner {
    fn retire(&mut self, entry: Entry) {
        entry.token.cancel();
        self.retired.retain(|task| !task.is_finished());
        if let Some(task) = entry.task {
            self.retired.push(task);
        }
    }
}

/// Everything a running entry task needs.
#[derive(Clone)]
struct Shared {
    orchestrator: Arc<Orchestrator>,
    store: Arc<HistoryStore>,
    /// Parent of every run started by this scheduler; cancelled by `shutdown`.
    root: CancellationToken,
}

pub struct Scheduler {
    shared: Shared,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<HistoryStore>) -> Self {
        Self {
            shared: Shared {
                orchestrator,
                store,
                root: CancellationToken::new(),
            },
            inner: Mutex::new(Inner {
                state: SchedulerState::Stopped,
                finished: false,
                entries: HashMap::new(),
                retired: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// Register (or replace) a job. When the scheduler is running the entry
    /// starts immediately, so this must be called from within a tokio runtime.
    pub fn add_job(&self, job: JobSpec) -> Result<(), SchedulerError> {
        if !job.is_scheduled() {
            return Err(SchedulerError::NoSchedule(job.name));
        }
        let expr = CronExpr::parse(&job.schedule).map_err(|source| SchedulerError::InvalidSchedule {
            job: job.name.clone(),
            schedule: job.schedule.clone(),
            source,
        })?;

        let name = job.name.clone();
        let mut entry = Entry {
            job: Arc::new(job),
            expr: Arc::new(expr),
            token: self.shared.root.child_token(),
            task: None,
        };

        let mut inner = self.lock();
        if inner.state == SchedulerState::Running {
            entry.task = Some(self.spawn_entry(&entry));
        }
        if let Some(old) = inner.entries.insert(name.clone(), entry) {
            inner.retire(old);
        }
        tracing::info!(job = %name, schedule = %inner.entries[&name].expr, "job scheduled");
        Ok(())
    }

    /// Unregister a job. Returns false if it was not registered. A run that
    /// is already in progress finishes normally.
    pub fn remove_job(&self, name: &str) -> bool {
        let mut inner = self.lock();
        match inner.entries.remove(name) {
            Some(entry) => {
                inner.retire(entry);
                tracing::info!(job = %name, "job unscheduled");
                true
            }
            None => false,
        }
    }

    /// Register every scheduled job in `cfg`. Jobs without a schedule are
    /// ignored; jobs whose schedule does not parse are logged and skipped.
    pub fn load_from_config(&self, cfg: &KeeperConfig) -> usize {
        let mut added = 0;
        for job in cfg.jobs.iter().filter(|j| j.is_scheduled()) {
            match self.add_job(job.clone()) {
                Ok(()) => added += 1,
                Err(e) => tracing::warn!(job = %job.name, error = %e, "skipping job"),
            }
        }
        added
    }

    /// Names of registered jobs, sorted.
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Next occurrence of a registered job, in local time.
    pub fn next_run(&self, name: &str) -> Option<DateTime<Local>> {
        let expr = Arc::clone(&self.lock().entries.get(name)?.expr);
        expr.next_after(&Local::now())
    }

    /// Start every registered entry. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut inner = self.lock();
        if inner.finished {
            return Err(SchedulerError::Stopped);
        }
        if inner.state == SchedulerState::Running {
            return Err(SchedulerError::AlreadyRunning);
        }
        inner.state = SchedulerState::Running;
        let Inner { entries, .. } = &mut *inner;
        for entry in entries.values_mut() {
            entry.task = Some(self.spawn_entry(entry));
        }
        tracing::info!(jobs = entries.len(), "scheduler started");
        Ok(())
    }

    /// Stop all entries and return a future that resolves once their tasks
    /// have exited. Timers stop before this returns; a run already in flight
    /// is allowed to finish and is recorded. Calling it again is a no-op.
    pub fn stop(&self) -> impl Future<Output = ()> + Send + 'static {
        let tasks: Option<Vec<JoinHandle<()>>> = {
            let mut inner = self.lock();
            if inner.finished {
                None
            } else {
                inner.finished = true;
                inner.state = SchedulerState::Stopped;
                let mut tasks = std::mem::take(&mut inner.retired);
                for entry in inner.entries.values_mut() {
                    entry.token.cancel();
                    tasks.extend(entry.task.take());
                }
                Some(tasks)
            }
        };
        async move {
            let Some(tasks) = tasks else { return };
            for task in tasks {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        tracing::error!(error = %e, "scheduler entry panicked");
                    }
                }
            }
            tracing::info!("scheduler stopped");
        }
    }

    /// Like [`stop`](Self::stop), but cancels runs in flight first. Cancelled
    /// runs are not recorded.
    pub fn shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        self.shared.root.cancel();
        self.stop()
    }

    fn spawn_entry(&self, entry: &Entry) -> JoinHandle<()> {
        tokio::spawn(run_entry(
            self.shared.clone(),
            Arc::clone(&entry.job),
            Arc::clone(&entry.expr),
            entry.token.clone(),
        ))
    }
}

async fn run_entry(
    shared: Shared,
    job: Arc<JobSpec>,
    expr: Arc<CronExpr>,
    token: CancellationToken,
) {
    let mut last: Option<DateTime<Local>> = None;
    loop {
        let now = Local::now();
        let Some(next) = next_occurrence(&expr, now, last) else {
            tracing::warn!(job = %job.name, schedule = %expr, "schedule has no future occurrence");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::debug!(job = %job.name, next = %next, "waiting for next run");

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }

        fire(&shared, &job).await;
        if token.is_cancelled() {
            return;
        }
        last = Some(next);
    }
}

/// Next occurrence after both `now` and the occurrence that last fired, so a
/// wall clock running behind the timer never repeats an occurrence.
fn next_occurrence<Tz: TimeZone>(
    expr: &CronExpr,
    now: DateTime<Tz>,
    last: Option<DateTime<Tz>>,
) -> Option<DateTime<Tz>> {
    let from = match last {
        Some(last) if last > now => last,
        _ => now,
    };
    expr.next_after(&from)
}

async fn fire(shared: &Shared, job: &JobSpec) {
    tracing::info!(job = %job.name, "scheduled run starting");
    match shared.orchestrator.run(job, false, &shared.root, None).await {
        Ok(result) => {
            shared
                .store
                .append(&RunRecord::from_result(&job.name, &result, false));
            if result.success {
                tracing::info!(job = %job.name, "scheduled run succeeded");
            } else {
                tracing::warn!(job = %job.name, errors = ?result.errors, "scheduled run failed");
            }
        }
        Err(RunError::Cancelled) => {
            tracing::info!(job = %job.name, "scheduled run cancelled");
        }
        Err(e) => {
            tracing::warn!(job = %job.name, error = %e, "scheduled run not started");
        }
    }
}
