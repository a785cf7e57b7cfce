//! Tests for global options.

use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_global_defaults() {
    let cli = Cli::try_parse_from(["retryd", "status"]).unwrap();
    assert!(cli.config.is_none());
    assert!(cli.db.is_none());
    assert!(cli.outbox.is_none());
    assert!(!cli.memory);
}

#[test]
fn cli_global_options_before_and_after_subcommand() {
    let cli = Cli::try_parse_from([
        "retryd",
        "--config",
        "/etc/retryd.toml",
        "sweep",
        "--db",
        "/var/lib/retryd/retry.db",
        "--outbox",
        "/var/lib/retryd/outbox",
    ])
    .unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("/etc/retryd.toml")));
    assert_eq!(cli.db.as_deref(), Some(Path::new("/var/lib/retryd/retry.db")));
    assert_eq!(cli.outbox.as_deref(), Some(Path::new("/var/lib/retryd/outbox")));
    assert!(matches!(cli.command, CliCommand::Sweep { now: None }));
}

#[test]
fn cli_memory_flag() {
    let cli = Cli::try_parse_from(["retryd", "--memory", "run"]).unwrap();
    assert!(cli.memory);
}

#[test]
fn cli_memory_conflicts_with_db() {
    assert!(Cli::try_parse_from(["retryd", "--memory", "--db", "x.db", "status"]).is_err());
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["retryd"]).is_err());
}
