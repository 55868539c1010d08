//! `keeper logs [job]` – run history.

use anyhow::Result;
use chrono::Local;
use keeper_core::config::KeeperConfig;
use keeper_core::history::{HistoryStore, RunRecord};
use keeper_core::report::{format_bytes, format_duration};

use super::{ellipsize, find_job};

fn local_time(r: &RunRecord) -> String {
    r.started_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

const JOB_LIMIT: usize = 20;
const RECENT_LIMIT: usize = 30;

fn status_label(r: &RunRecord) -> &'static str {
    if r.dry_run {
        "dry-run"
    } else if r.success {
        "ok"
    } else {
        "failed"
    }
}

pub fn run_logs(cfg: &KeeperConfig, job: Option<&str>, limit: Option<usize>) -> Result<()> {
    let store = HistoryStore::open_default()?;

    if let Some(name) = job {
        find_job(cfg, name)?;
        let records = store.job_records(name, limit.unwrap_or(JOB_LIMIT));
        if records.is_empty() {
            println!("No runs recorded for job {name:?}.");
            return Ok(());
        }
        println!(
            "{:<20} {:<8} {:<10} {:>8} {:>12}  {}",
            "DATE", "STATUS", "DURATION", "FILES", "TRANSFERRED", "ERRORS"
        );
        for r in &records {
            println!(
                "{:<20} {:<8} {:<10} {:>8} {:>12}  {}",
                local_time(r),
                status_label(r),
                format_duration(r.duration()),
                r.files_transferred,
                format_bytes(r.bytes_transferred),
                r.errors.first().map(|e| ellipsize(e, 40)).unwrap_or_default()
            );
        }
        return Ok(());
    }

    let records = store.recent_records(limit.unwrap_or(RECENT_LIMIT));
    if records.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }
    println!(
        "{:<20} {:<16} {:<8} {:<10} {:>12}",
        "DATE", "JOB", "STATUS", "DURATION", "TRANSFERRED"
    );
    for r in &records {
        println!(
            "{:<20} {:<16} {:<8} {:<10} {:>12}",
            local_time(r),
            ellipsize(&r.job_name, 16),
            status_label(r),
            format_duration(r.duration()),
            format_bytes(r.bytes_transferred)
        );
    }
    Ok(())
}
