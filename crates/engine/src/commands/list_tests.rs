// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use ebb_core::Action;
use serde_json::json;

#[test]
fn select_keeps_replay_order() {
    let ctx = TestContext::new();
    let create = ctx.enqueue("todo", "b", Action::Create, json!({"n": 2}));
    let update = ctx.enqueue("todo", "a", Action::Update, json!({"n": 1}));

    let ids: Vec<String> = select(&ctx.engine, &[]).unwrap().into_iter().map(|r| r.id).collect();
    // same resource weight, so the lighter action goes first
    assert_eq!(ids, vec![update.id, create.id]);
}

#[test]
fn select_filters_by_status() {
    let ctx = TestContext::new();
    ctx.enqueue("todo", "a", Action::Create, json!({}));
    let failed = ctx.failed("b");

    let records = select(&ctx.engine, &[Status::Failed]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, failed.id);

    let both = select(&ctx.engine, &[Status::Failed, Status::Pending]).unwrap();
    assert_eq!(both.len(), 2);
}

#[test]
fn record_line_shows_status_resource_and_error() {
    let ctx = TestContext::new();
    let failed = ctx.failed("b");
    let line = format_record_line(&failed);

    assert!(line.starts_with(&failed.id));
    assert!(line.contains("failed"));
    assert!(line.contains("update"));
    assert!(line.contains("todo/b"));
    assert!(line.ends_with("(server said no)"));
    assert!(!line.contains("retries="));
}

#[test]
fn run_impl_prints_without_error() {
    let ctx = TestContext::new();
    ctx.enqueue("todo", "a", Action::Create, json!({}));
    run_impl(&ctx.engine, &[], OutputFormat::Text).unwrap();
    run_impl(&ctx.engine, &[], OutputFormat::Json).unwrap();
    run_corrupted(&ctx.engine, OutputFormat::Text).unwrap();
}
