//! `keeper status` – recent success rate and per-job last run.

use anyhow::Result;
use chrono::{Duration, Utc};
use keeper_core::config::KeeperConfig;
use keeper_core::history::{calculate_stats, HistoryStore};
use keeper_core::report::{format_bytes, format_duration, format_time_ago};

const WINDOW_DAYS: i64 = 30;

pub fn run_status(cfg: &KeeperConfig) -> Result<()> {
    let store = HistoryStore::open_default()?;
    let now = Utc::now();
    let stats = calculate_stats(&store.load_all(), Some(now - Duration::days(WINDOW_DAYS)));

    println!("keeper status");
    println!("  {:<20} {:.1}%", format!("Success rate ({WINDOW_DAYS}d)"), stats.success_rate);
    println!("  {:<20} {}", "Total transferred", format_bytes(stats.total_bytes));
    println!("  {:<20} {}", "Avg duration", format_duration(stats.avg_duration));
    println!("  {:<20} {}", format!("Jobs run ({WINDOW_DAYS}d)"), stats.total_runs);
    println!();

    if cfg.jobs.is_empty() {
        println!("No jobs configured.");
        return Ok(());
    }

    println!(
        "{:<16} {:<14} {:<12} {:<10} {:<10} {}",
        "NAME", "SCHEDULE", "LAST RUN", "STATUS", "DURATION", "TRANSFERRED"
    );
    for job in &cfg.jobs {
        let schedule = if job.is_scheduled() { job.schedule.as_str() } else { "manual" };
        match store.job_records(&job.name, 1).first() {
            Some(r) => println!(
                "{:<16} {:<14} {:<12} {:<10} {:<10} {}",
                job.name,
                schedule,
                format_time_ago(r.completed_at, now),
                if r.success { "ok" } else { "failed" },
                format_duration(r.duration()),
                format_bytes(r.bytes_transferred)
            ),
            None => println!(
                "{:<16} {:<14} {:<12} {:<10} {:<10} {}",
                job.name, schedule, "never", "-", "-", "-"
            ),
        }
    }
    Ok(())
}
