//! CLI command handlers, one per file.

mod daemon;
mod doctor;
mod init;
mod list;
mod logs;
mod progress;
mod remove;
mod run;
mod status;

pub use daemon::run_daemon;
pub use doctor::run_doctor;
pub use init::run_init;
pub use list::run_list;
pub use logs::run_logs;
pub use remove::run_remove;
pub use run::{run_jobs, run_test};
pub use status::run_status;

use anyhow::{anyhow, Result};
use keeper_core::config::KeeperConfig;
use keeper_core::job::JobSpec;
use tokio_util::sync::CancellationToken;

fn find_job<'a>(cfg: &'a KeeperConfig, name: &str) -> Result<&'a JobSpec> {
    cfg.find_job(name)
        .ok_or_else(|| anyhow!("job {name:?} not found"))
}

/// Root token for manual runs, cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupted, stopping rsync...");
            trigger.cancel();
        }
    });
    token
}

/// Truncate `s` to at most `max` characters, marking the cut with "...".
fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{keep}...")
}

#[cfg(test)]
mod tests {
    use super::ellipsize;

    #[test]
    fn ellipsize_short_and_long() {
        assert_eq!(ellipsize("abc", 5), "abc");
        assert_eq!(ellipsize("abcdefgh", 6), "abc...");
    }
}
