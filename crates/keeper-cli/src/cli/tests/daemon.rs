//! Tests for daemon subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand, DaemonAction};
use clap::Parser;

#[test]
fn cli_parse_daemon_actions() {
    for (arg, expected) in [
        ("start", DaemonAction::Start),
        ("stop", DaemonAction::Stop),
        ("status", DaemonAction::Status),
    ] {
        match parse(&["keeper", "daemon", arg]) {
            CliCommand::Daemon { action } => assert_eq!(action, expected),
            _ => panic!("expected Daemon {arg}"),
        }
    }
}

#[test]
fn cli_parse_daemon_requires_action() {
    assert!(Cli::try_parse_from(["keeper", "daemon"]).is_err());
}
