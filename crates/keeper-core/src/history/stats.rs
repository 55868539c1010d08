//! Aggregates over run records. Dry runs never count.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{HistoryStore, RunRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub total_runs: usize,
    pub success_count: usize,
    pub fail_count: usize,
    /// Percentage in `0.0..=100.0`; 0 when there are no runs.
    pub success_rate: f64,
    pub total_bytes: u64,
    pub avg_duration: Duration,
    /// Record with the latest completion time.
    pub last_run: Option<RunRecord>,
}

/// Aggregate `records`, ignoring dry runs and runs started before `since`.
pub fn calculate_stats(records: &[RunRecord], since: Option<DateTime<Utc>>) -> Stats {
    let mut stats = Stats::default();
    let mut total_duration = Duration::ZERO;
    let mut last: Option<&RunRecord> = None;

    for r in records {
        if r.dry_run {
            continue;
        }
        if since.is_some_and(|since| r.started_at < since) {
            continue;
        }

        stats.total_runs += 1;
        if r.success {
            stats.success_count += 1;
        } else {
            stats.fail_count += 1;
        }
        stats.total_bytes += r.bytes_transferred;
        total_duration += r.duration();

        if last.map_or(true, |l| r.completed_at > l.completed_at) {
            last = Some(r);
        }
    }

    if stats.total_runs > 0 {
        stats.success_rate = stats.success_count as f64 / stats.total_runs as f64 * 100.0;
        stats.avg_duration = total_duration / stats.total_runs as u32;
    }
    stats.last_run = last.cloned();
    stats
}

/// All-time stats for one job.
pub fn job_stats(store: &HistoryStore, job_name: &str) -> Stats {
    calculate_stats(&store.job_records(job_name, 0), None)
}
