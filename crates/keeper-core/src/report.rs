//! Human-readable rendering of sizes, durations, and run results.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::Duration;

use crate::backend::TransferResult;

/// `512 B`, `1.5 KB`, `3.0 GB` (binary multiples).
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {unit}B", bytes as f64 / div as f64)
}

/// `42s`, `3m 05s`, `2h 07m`, rounded to the nearest second.
pub fn format_duration(d: Duration) -> String {
    let secs = (d.as_millis() + 500) / 1000;
    if secs < 60 {
        return format!("{secs}s");
    }
    if secs < 3600 {
        return format!("{}m {:02}s", secs / 60, secs % 60);
    }
    format!("{}h {:02}m", secs / 3600, (secs / 60) % 60)
}

/// Relative time such as `5m ago`; older than a week prints the date.
pub fn format_time_ago(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let d = now - t;
    if d.num_minutes() < 1 {
        "just now".to_string()
    } else if d.num_hours() < 1 {
        format!("{}m ago", d.num_minutes())
    } else if d.num_days() < 1 {
        format!("{}h ago", d.num_hours())
    } else if d.num_days() < 7 {
        format!("{}d ago", d.num_days())
    } else {
        t.format("%b %d").to_string()
    }
}

/// Multi-line summary of one job's result.
pub fn render_result(job_name: &str, result: &TransferResult, dry_run: bool) -> String {
    let mut out = String::new();
    let title = if dry_run { "Dry run results" } else { "Sync results" };
    let _ = writeln!(out, "{title}: {job_name}");
    let status = if result.success {
        "completed successfully"
    } else {
        "completed with errors"
    };
    let _ = writeln!(out, "  {status}");
    let _ = writeln!(out, "  {:<18} {}", "Duration", format_duration(result.duration()));
    let _ = writeln!(out, "  {:<18} {}", "Files total", result.files_total);
    let _ = writeln!(out, "  {:<18} {}", "Files transferred", result.files_transferred);
    let _ = writeln!(out, "  {:<18} {}", "Total size", format_bytes(result.bytes_total));
    let _ = writeln!(out, "  {:<18} {}", "Transferred", format_bytes(result.bytes_transferred));
    if !result.errors.is_empty() {
        let _ = writeln!(out, "  Errors:");
        for e in &result.errors {
            let _ = writeln!(out, "    {e}");
        }
    }
    out
}

pub fn print_result(job_name: &str, result: &TransferResult, dry_run: bool) {
    println!();
    print!("{}", render_result(job_name, result, dry_run));
}
