// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use crate::error::Error;
use ebb_core::Action;
use serde_json::json;

#[test]
fn details_of_a_pending_record() {
    let ctx = TestContext::new();
    let record = ctx.enqueue("todo", "todo-1", Action::Create, json!({"title": "A"}));
    let text = format_details(&record, false);

    assert!(text.contains("resource:  todo/todo-1"));
    assert!(text.contains("status:    pending\n"));
    assert!(text.contains("clock:     dev1:1"));
    assert!(text.ends_with(r#"payload:   {"title":"A"}"#));
    assert!(!text.contains("error:"));
}

#[test]
fn details_mark_parked_conflicts_and_errors() {
    let ctx = TestContext::new();
    let record = ctx.failed("todo-2");
    let text = format_details(&record, true);

    assert!(text.contains("status:    failed (conflict)"));
    assert!(text.contains("error:     server said no"));
}

#[test]
fn unknown_id_is_not_found() {
    let ctx = TestContext::new();
    let err = run_impl(&ctx.engine, "op-missing", OutputFormat::Text).unwrap_err();
    assert!(matches!(err, Error::Core(ebb_core::Error::RecordNotFound(_))));
}
