//! Tests for run and test subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_run_job() {
    match parse(&["keeper", "run", "docs"]) {
        CliCommand::Run { job, all, dry_run } => {
            assert_eq!(job.as_deref(), Some("docs"));
            assert!(!all);
            assert!(!dry_run);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_all_dry_run() {
    match parse(&["keeper", "run", "--all", "--dry-run"]) {
        CliCommand::Run { job, all, dry_run } => {
            assert!(job.is_none());
            assert!(all);
            assert!(dry_run);
        }
        _ => panic!("expected Run --all"),
    }
}

#[test]
fn cli_parse_run_all_with_job_is_rejected() {
    assert!(Cli::try_parse_from(["keeper", "run", "docs", "--all"]).is_err());
}

#[test]
fn cli_parse_test_requires_job() {
    match parse(&["keeper", "test", "docs"]) {
        CliCommand::Test { job } => assert_eq!(job, "docs"),
        _ => panic!("expected Test"),
    }
    assert!(Cli::try_parse_from(["keeper", "test"]).is_err());
}
