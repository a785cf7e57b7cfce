//! Tests for process, ingest, sweep, run and status subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_process() {
    match parse(&[
        "retryd",
        "process",
        "--id",
        "m-1",
        "--header",
        "x-ibm-retry-origin-topic=orders",
        "--header",
        "x-ibm-retry-attempts=2",
        "--payload",
        r#"{"n":1}"#,
    ]) {
        CliCommand::Process {
            id,
            headers,
            payload,
        } => {
            assert_eq!(id, "m-1");
            assert_eq!(
                headers,
                vec!["x-ibm-retry-origin-topic=orders", "x-ibm-retry-attempts=2"]
            );
            assert_eq!(payload.as_deref(), Some(r#"{"n":1}"#));
        }
        _ => panic!("expected Process"),
    }
}

#[test]
fn cli_parse_process_defaults() {
    match parse(&["retryd", "process", "--id", "m"]) {
        CliCommand::Process {
            headers, payload, ..
        } => {
            assert!(headers.is_empty());
            assert!(payload.is_none());
        }
        _ => panic!("expected Process"),
    }
}

#[test]
fn cli_process_requires_id() {
    assert!(Cli::try_parse_from(["retryd", "process"]).is_err());
}

#[test]
fn cli_parse_ingest_stdin() {
    match parse(&["retryd", "ingest"]) {
        CliCommand::Ingest { path } => assert!(path.is_none()),
        _ => panic!("expected Ingest"),
    }
}

#[test]
fn cli_parse_ingest_path() {
    match parse(&["retryd", "ingest", "/tmp/messages.jsonl"]) {
        CliCommand::Ingest { path } => {
            assert_eq!(path.as_deref(), Some(Path::new("/tmp/messages.jsonl")));
        }
        _ => panic!("expected Ingest with path"),
    }
}

#[test]
fn cli_parse_sweep() {
    match parse(&["retryd", "sweep"]) {
        CliCommand::Sweep { now } => assert!(now.is_none()),
        _ => panic!("expected Sweep"),
    }
}

#[test]
fn cli_parse_sweep_now() {
    match parse(&["retryd", "sweep", "--now", "1700000000000"]) {
        CliCommand::Sweep { now } => assert_eq!(now, Some(1_700_000_000_000)),
        _ => panic!("expected Sweep with --now"),
    }
}

#[test]
fn cli_parse_run() {
    match parse(&["retryd", "run"]) {
        CliCommand::Run { ingest } => assert!(ingest.is_none()),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_ingest() {
    match parse(&["retryd", "run", "--ingest", "in.jsonl"]) {
        CliCommand::Run { ingest } => {
            assert_eq!(ingest.as_deref(), Some(Path::new("in.jsonl")));
        }
        _ => panic!("expected Run with --ingest"),
    }
}

#[test]
fn cli_parse_status() {
    match parse(&["retryd", "status"]) {
        CliCommand::Status => {}
        _ => panic!("expected Status"),
    }
}
