//! `keeper run` and `keeper test` – run jobs now.

use anyhow::{bail, Result};
use keeper_core::backend::{rsync::args::build_destination, ProgressEvent, ProgressFn};
use keeper_core::config::KeeperConfig;
use keeper_core::control::RunRegistry;
use keeper_core::history::{HistoryStore, RunRecord};
use keeper_core::job::JobSpec;
use keeper_core::orchestrator::Orchestrator;
use keeper_core::report::print_result;
use std::sync::Arc;

use super::progress::ProgressLine;
use super::{cancel_on_ctrl_c, find_job};

fn print_job_header(job: &JobSpec, dry_run: bool) {
    println!("Running job {:?}", job.name);
    println!("  {:<8} {}", "Source", job.source_summary());
    println!("  {:<8} {}", "Dest", build_destination(&job.destination));
    if dry_run {
        println!("  dry-run: no files will be transferred");
    }
    println!();
}

pub async fn run_jobs(cfg: &KeeperConfig, job: Option<&str>, all: bool, dry_run: bool) -> Result<()> {
    let store = HistoryStore::open_default()?;
    let orchestrator = Orchestrator::new(Arc::new(RunRegistry::new()));
    let root = cancel_on_ctrl_c();

    if all {
        if cfg.jobs.is_empty() {
            println!("No jobs configured.");
            return Ok(());
        }
        println!("Running all {} jobs...\n", cfg.jobs.len());
        let mut progress = ProgressLine::default();
        let results = orchestrator
            .run_all(&cfg.jobs, dry_run, &root, |name, ev| progress.update(name, &ev))
            .await;
        progress.clear();

        let mut failed = 0;
        for (name, result) in &results {
            print_result(name, result, dry_run);
            store.append(&RunRecord::from_result(name, result, dry_run));
            if !result.success {
                failed += 1;
            }
        }
        if failed > 0 {
            bail!("{failed} of {} jobs failed", results.len());
        }
        return Ok(());
    }

    let Some(name) = job else {
        bail!("specify a job name or use --all");
    };
    let job = find_job(cfg, name)?;
    print_job_header(job, dry_run);

    let mut progress = ProgressLine::default();
    let mut on_progress = |ev: ProgressEvent| progress.update(&job.name, &ev);
    let callback: ProgressFn<'_> = &mut on_progress;
    let outcome = orchestrator.run(job, dry_run, &root, Some(callback)).await;
    progress.clear();
    let result = outcome?;

    print_result(&job.name, &result, dry_run);
    store.append(&RunRecord::from_result(&job.name, &result, dry_run));
    if !result.success {
        bail!("job {:?} completed with errors", job.name);
    }
    Ok(())
}

/// Dry run without touching history.
pub async fn run_test(cfg: &KeeperConfig, name: &str) -> Result<()> {
    let job = find_job(cfg, name)?;
    print_job_header(job, true);

    let orchestrator = Orchestrator::new(Arc::new(RunRegistry::new()));
    let root = cancel_on_ctrl_c();
    let mut progress = ProgressLine::default();
    let mut on_progress = |ev: ProgressEvent| progress.update(&job.name, &ev);
    let callback: ProgressFn<'_> = &mut on_progress;
    let outcome = orchestrator.run(job, true, &root, Some(callback)).await;
    progress.clear();

    print_result(&job.name, &outcome?, true);
    Ok(())
}
