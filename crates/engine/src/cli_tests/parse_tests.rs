// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use std::path::Path;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["ebb"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn parse_err(args: &[&str]) -> clap::error::ErrorKind {
    let mut argv = vec!["ebb"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv) {
        Ok(_) => panic!("expected {args:?} to be rejected"),
        Err(e) => e.kind(),
    }
}

#[test]
fn enqueue_parses_positionals() {
    let cli = parse(&["enqueue", "todo", "todo-1", "update", r#"{"title":"A"}"#, "-o", "json"]);
    match cli.command {
        Command::Enqueue { resource_type, resource_id, action, payload, output } => {
            assert_eq!(resource_type, "todo");
            assert_eq!(resource_id, "todo-1");
            assert_eq!(action, ActionArg::Update);
            assert_eq!(payload.as_deref(), Some(r#"{"title":"A"}"#));
            assert_eq!(output, OutputFormat::Json);
        }
        _ => panic!("expected enqueue"),
    }
}

#[test]
fn enqueue_payload_is_optional() {
    let cli = parse(&["enqueue", "todo", "todo-1", "delete"]);
    assert!(matches!(cli.command, Command::Enqueue { payload: None, .. }));
}

#[test]
fn enqueue_rejects_blank_resource_and_unknown_action() {
    assert_eq!(parse_err(&["enqueue", " ", "todo-1", "create"]), clap::error::ErrorKind::ValueValidation);
    assert_eq!(parse_err(&["enqueue", "todo", "todo-1", "upsert"]), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn dir_is_global() {
    let cli = parse(&["list", "--dir", "/tmp/ebb"]);
    assert_eq!(cli.dir.as_deref(), Some(Path::new("/tmp/ebb")));

    let cli = parse(&["-d", "/tmp/other", "status"]);
    assert_eq!(cli.dir.as_deref(), Some(Path::new("/tmp/other")));
}

#[test]
fn list_status_filter_repeats() {
    let cli = parse(&["list", "-s", "failed", "-s", "retrying"]);
    match cli.command {
        Command::List { status, corrupted, output } => {
            assert_eq!(status, vec![StatusArg::Failed, StatusArg::Retrying]);
            assert!(!corrupted);
            assert_eq!(output, OutputFormat::Text);
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn list_corrupted_conflicts_with_status() {
    assert_eq!(parse_err(&["list", "--corrupted", "-s", "failed"]), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn retry_needs_ids_or_all() {
    assert!(matches!(parse(&["retry", "--all"]).command, Command::Retry { all: true, .. }));
    match parse(&["retry", "op-1", "op-2"]).command {
        Command::Retry { ids, all } => {
            assert_eq!(ids, vec!["op-1", "op-2"]);
            assert!(!all);
        }
        _ => panic!("expected retry"),
    }
    assert_eq!(parse_err(&["retry", "op-1", "--all"]), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn init_token_requires_remote() {
    assert_eq!(parse_err(&["init", "--token", "secret"]), clap::error::ErrorKind::MissingRequiredArgument);

    match parse(&["init", "--remote", "ws://localhost:7890", "--token", "secret"]).command {
        Command::Init { device_id, remote, token } => {
            assert!(device_id.is_none());
            assert_eq!(remote.as_deref(), Some("ws://localhost:7890"));
            assert_eq!(token.as_deref(), Some("secret"));
        }
        _ => panic!("expected init"),
    }
}

#[test]
fn sync_and_run_flags() {
    assert!(matches!(parse(&["sync", "--force"]).command, Command::Sync { force: true, .. }));
    assert!(matches!(parse(&["run"]).command, Command::Run { probe_interval: 5 }));
    assert!(matches!(parse(&["run", "--probe-interval", "1"]).command, Command::Run { probe_interval: 1 }));
}

#[test]
fn resolve_takes_id_and_choice() {
    match parse(&["resolve", "op-1", "theirs"]).command {
        Command::Resolve { id, choice } => {
            assert_eq!(id, "op-1");
            assert_eq!(choice, "theirs");
        }
        _ => panic!("expected resolve"),
    }
}

#[test]
fn kebab_case_subcommands() {
    assert!(matches!(parse(&["clear-failed"]).command, Command::ClearFailed));
    assert!(matches!(parse(&["completions", "bash"]).command, Command::Completions { .. }));
}
