// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use ebb_core::Action;
use serde_json::{json, Value};

#[test]
fn exports_every_record_as_a_versioned_bundle() {
    let ctx = TestContext::new();
    let a = ctx.enqueue("todo", "a", Action::Create, json!({"title": "A"}));
    ctx.enqueue("todo", "b", Action::Delete, json!({}));

    let mut out = Vec::new();
    let count = run_impl(&ctx.engine, &mut out).unwrap();
    assert_eq!(count, 2);

    let bundle: Value = serde_json::from_slice(&out).unwrap();
    assert!(bundle["version"].as_str().unwrap().starts_with("1."));
    assert!(bundle["timestamp"].is_string());
    let items = bundle["items"].as_array().unwrap();
    assert!(items.iter().any(|item| item["id"] == a.id.as_str()));
}

#[test]
fn empty_queue_exports_empty_items() {
    let ctx = TestContext::new();
    let mut out = Vec::new();
    assert_eq!(run_impl(&ctx.engine, &mut out).unwrap(), 0);

    let bundle: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(bundle["items"], json!([]));
}
