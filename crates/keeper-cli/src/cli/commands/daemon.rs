//! `keeper daemon start|stop|status` – foreground scheduler with a PID file.

use anyhow::{bail, Context, Result};
use keeper_core::config::{self, KeeperConfig};
use keeper_core::control::RunRegistry;
use keeper_core::history::HistoryStore;
use keeper_core::orchestrator::Orchestrator;
use keeper_core::scheduler::Scheduler;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cli::DaemonAction;

const PID_FILE: &str = "keeper.pid";

fn pid_file_path() -> Result<PathBuf> {
    Ok(config::data_dir()?.join(PID_FILE))
}

fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Removes the PID file when dropped.
struct PidFile {
    path: PathBuf,
}

impl PidFile {
    fn create(path: PathBuf) -> Result<Self> {
        if let Some(pid) = read_pid(&path) {
            if process_alive(pid) {
                bail!("daemon already running (PID {pid})");
            }
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        fs::write(&path, std::process::id().to_string())
            .with_context(|| format!("write PID file: {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    // Signal 0 checks existence and permission without delivering anything.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    false
}

#[cfg(unix)]
fn terminate(pid: i32) -> Result<()> {
    if unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) } != 0 {
        let err = std::io::Error::last_os_error();
        bail!("sending SIGTERM to {pid}: {err}");
    }
    Ok(())
}

#[cfg(not(unix))]
fn terminate(_pid: i32) -> Result<()> {
    bail!("daemon stop is only supported on unix")
}

fn build_scheduler(
    cfg: &KeeperConfig,
    registry: &Arc<RunRegistry>,
    store: &Arc<HistoryStore>,
) -> Result<Scheduler> {
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(registry)));
    let scheduler = Scheduler::new(orchestrator, Arc::clone(store));
    let loaded = scheduler.load_from_config(cfg);
    scheduler.start()?;
    for name in scheduler.job_names() {
        if let Some(next) = scheduler.next_run(&name) {
            println!("  {name:<18} next run {}", next.format("%Y-%m-%d %H:%M"));
        }
    }
    tracing::info!(jobs = loaded, "scheduler loaded");
    Ok(scheduler)
}

enum Signal {
    Reload,
    Shutdown,
}

#[cfg(unix)]
struct Signals {
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hangup: signal(SignalKind::hangup()).context("install SIGHUP handler")?,
            interrupt: signal(SignalKind::interrupt()).context("install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("install SIGTERM handler")?,
        })
    }

    async fn next(&mut self) -> Signal {
        tokio::select! {
            _ = self.hangup.recv() => Signal::Reload,
            _ = self.interrupt.recv() => Signal::Shutdown,
            _ = self.terminate.recv() => Signal::Shutdown,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Signal {
        let _ = tokio::signal::ctrl_c().await;
        Signal::Shutdown
    }
}

async fn start() -> Result<()> {
    let cfg = config::load()?;
    let _pid_file = PidFile::create(pid_file_path()?)?;
    let mut signals = Signals::install()?;

    let registry = Arc::new(RunRegistry::new());
    let store = Arc::new(HistoryStore::open_default()?);

    println!("keeper daemon started (PID {})", std::process::id());
    tracing::info!(pid = std::process::id(), "daemon starting");
    let mut scheduler = build_scheduler(&cfg, &registry, &store)?;
    // Schedulers replaced by a reload, still finishing their runs.
    let mut draining: Vec<(Scheduler, JoinHandle<()>)> = Vec::new();

    loop {
        match signals.next().await {
            Signal::Reload => {
                tracing::info!("SIGHUP received, reloading config");
                let cfg = match config::load() {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        tracing::error!(error = %format!("{e:#}"), "reload failed, keeping current schedule");
                        eprintln!("reload failed: {e:#}");
                        continue;
                    }
                };
                let drained = tokio::spawn(scheduler.stop());
                let retired = std::mem::replace(
                    &mut scheduler,
                    build_scheduler(&cfg, &registry, &store)?,
                );
                draining.retain(|(_, task)| !task.is_finished());
                draining.push((retired, drained));
                println!("configuration reloaded");
            }
            Signal::Shutdown => {
                tracing::info!("shutdown signal received");
                println!("shutting down...");
                scheduler.shutdown().await;
                for (retired, drained) in draining {
                    retired.shutdown().await;
                    let _ = drained.await;
                }
                break;
            }
        }
    }

    if store.failed_appends() > 0 {
        tracing::warn!(failed = store.failed_appends(), "some history records were not saved");
    }
    println!("daemon stopped");
    Ok(())
}

fn stop() -> Result<()> {
    let path = pid_file_path()?;
    let Some(pid) = read_pid(&path) else {
        bail!("daemon not running (no PID file)");
    };
    terminate(pid)?;
    println!("Sent stop signal to daemon (PID {pid})");
    Ok(())
}

fn status() -> Result<()> {
    let path = pid_file_path()?;
    match read_pid(&path) {
        None => println!("Daemon is not running"),
        Some(pid) if process_alive(pid) => println!("Daemon is running (PID {pid})"),
        Some(_) => {
            println!("Daemon is not running (stale PID file removed)");
            let _ = fs::remove_file(&path);
        }
    }
    Ok(())
}

pub async fn run_daemon(action: DaemonAction) -> Result<()> {
    match action {
        DaemonAction::Start => start().await,
        DaemonAction::Stop => stop(),
        DaemonAction::Status => status(),
    }
}
