//! `keeper list` – show configured jobs.

use anyhow::Result;
use chrono::Utc;
use keeper_core::backend::rsync::args::build_destination;
use keeper_core::config::KeeperConfig;
use keeper_core::history::HistoryStore;
use keeper_core::report::format_time_ago;

use super::ellipsize;

pub fn run_list(cfg: &KeeperConfig) -> Result<()> {
    if cfg.jobs.is_empty() {
        println!("No jobs configured. Add [[jobs]] entries to the config file.");
        return Ok(());
    }

    let store = HistoryStore::open_default()?;
    let now = Utc::now();
    println!(
        "{:<18} {:<28} {:<30} {:<16} {}",
        "NAME", "SOURCE", "DESTINATION", "SCHEDULE", "LAST RUN"
    );
    for job in &cfg.jobs {
        let schedule = if job.is_scheduled() { job.schedule.as_str() } else { "manual" };
        let last_run = store
            .job_records(&job.name, 1)
            .first()
            .map(|r| format_time_ago(r.completed_at, now))
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<18} {:<28} {:<30} {:<16} {}",
            ellipsize(&job.name, 18),
            ellipsize(&job.source_summary(), 28),
            ellipsize(&build_destination(&job.destination), 30),
            schedule,
            last_run
        );
    }
    Ok(())
}
