// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

//! Routing tests for the public `run()` function.
//!
//! Every case passes an explicit `--dir`, so nothing touches the user's
//! data directory.

use super::*;
use clap::Parser;
use tempfile::TempDir;

fn cli(dir: &TempDir, args: &[&str]) -> Cli {
    let dir = dir.path().to_str().unwrap();
    let mut argv = vec!["ebb", "--dir", dir];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn init_then_enqueue_routes_to_the_data_dir() {
    let dir = TempDir::new().unwrap();
    run(cli(&dir, &["init", "--device-id", "dev1"])).unwrap();
    run(cli(&dir, &["enqueue", "todo", "todo-1", "create", r#"{"title":"A"}"#])).unwrap();

    let engine = Engine::open(dir.path()).unwrap();
    let records = engine.queue().list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_id, "todo-1");
    assert_eq!(records[0].clock.get("dev1"), 1);
}

#[test]
fn commands_fail_before_init() {
    let dir = TempDir::new().unwrap();
    let err = run(cli(&dir, &["list"])).unwrap_err();
    assert!(matches!(err, Error::NotInitialized(_)));
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    run(cli(&dir, &["init", "--device-id", "dev1"])).unwrap();
    let err = run(cli(&dir, &["init"])).unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(_)));
}

#[test]
fn discard_of_unknown_record_fails() {
    let dir = TempDir::new().unwrap();
    run(cli(&dir, &["init", "--device-id", "dev1"])).unwrap();
    assert!(run(cli(&dir, &["discard", "op-missing"])).is_err());
}

#[test]
fn sync_without_remote_fails() {
    let dir = TempDir::new().unwrap();
    run(cli(&dir, &["init", "--device-id", "dev1"])).unwrap();
    let err = run(cli(&dir, &["sync"])).unwrap_err();
    assert!(matches!(err, Error::NoRemote));
}
