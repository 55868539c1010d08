//! Tests for the remaining subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_simple_commands() {
    assert!(matches!(parse(&["keeper", "init"]), CliCommand::Init));
    assert!(matches!(parse(&["keeper", "list"]), CliCommand::List));
    assert!(matches!(parse(&["keeper", "status"]), CliCommand::Status));
    assert!(matches!(parse(&["keeper", "doctor"]), CliCommand::Doctor));
}

#[test]
fn cli_parse_logs() {
    match parse(&["keeper", "logs"]) {
        CliCommand::Logs { job, limit } => {
            assert!(job.is_none());
            assert!(limit.is_none());
        }
        _ => panic!("expected Logs"),
    }
    match parse(&["keeper", "logs", "docs", "-n", "5"]) {
        CliCommand::Logs { job, limit } => {
            assert_eq!(job.as_deref(), Some("docs"));
            assert_eq!(limit, Some(5));
        }
        _ => panic!("expected Logs with limit"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["keeper", "remove", "docs"]) {
        CliCommand::Remove { job, yes } => {
            assert_eq!(job, "docs");
            assert!(!yes);
        }
        _ => panic!("expected Remove"),
    }
    match parse(&["keeper", "remove", "docs", "-y"]) {
        CliCommand::Remove { yes, .. } => assert!(yes),
        _ => panic!("expected Remove -y"),
    }
}

#[test]
fn cli_parse_unknown_command_fails() {
    assert!(Cli::try_parse_from(["keeper", "frobnicate"]).is_err());
}
