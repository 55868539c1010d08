//! CLI for the keeper sync scheduler.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keeper_core::{config, logging};

use commands::{
    run_daemon, run_doctor, run_init, run_jobs, run_list, run_logs, run_remove, run_status,
    run_test,
};

/// Top-level CLI for keeper.
#[derive(Debug, Parser)]
#[command(name = "keeper")]
#[command(about = "keeper: scheduled rsync backups with run history", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create a default configuration file.
    Init,

    /// Run a job now (or every job with --all).
    Run {
        /// Job name.
        job: Option<String>,

        /// Run every configured job, one after another.
        #[arg(long, conflicts_with = "job")]
        all: bool,

        /// Pass --dry-run to rsync; nothing is transferred.
        #[arg(long)]
        dry_run: bool,
    },

    /// Dry-run a job and show what would be transferred.
    Test {
        /// Job name.
        job: String,
    },

    /// List configured jobs.
    List,

    /// Show 30-day statistics and the last run of each job.
    Status,

    /// Show run history, for one job or across all jobs.
    Logs {
        /// Only show runs of this job.
        job: Option<String>,

        /// Number of entries (default 20 for one job, 30 overall).
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Remove a job from the configuration.
    Remove {
        /// Job name.
        job: String,

        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Check dependencies, configuration, and destination connectivity.
    Doctor,

    /// Run or control the scheduling daemon.
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum DaemonAction {
    /// Run the scheduler in the foreground until SIGINT/SIGTERM; SIGHUP reloads.
    Start,
    /// Send SIGTERM to the running daemon.
    Stop,
    /// Report whether the daemon is running.
    Status,
}

/// Log to the configured file when a config exists, otherwise to stderr.
fn init_logging() {
    let file_logging = config::load().and_then(|cfg| {
        let dir = logging::log_dir(&cfg.log_dir)?;
        logging::init_logging(&dir, &cfg.log_level)
    });
    if file_logging.is_err() {
        logging::init_logging_stderr("warn");
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        init_logging();

        match cli.command {
            CliCommand::Init => run_init()?,
            CliCommand::Run { job, all, dry_run } => {
                let cfg = config::load()?;
                run_jobs(&cfg, job.as_deref(), all, dry_run).await?;
            }
            CliCommand::Test { job } => run_test(&config::load()?, &job).await?,
            CliCommand::List => run_list(&config::load()?)?,
            CliCommand::Status => run_status(&config::load()?)?,
            CliCommand::Logs { job, limit } => run_logs(&config::load()?, job.as_deref(), limit)?,
            CliCommand::Remove { job, yes } => run_remove(&job, yes)?,
            CliCommand::Doctor => run_doctor().await?,
            CliCommand::Daemon { action } => run_daemon(action).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
