// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use ebb_core::Status;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    absent = { None, json!({}) },
    object = { Some(r#"{"title":"A"}"#), json!({"title": "A"}) },
    padded = { Some("  [1, 2]\n"), json!([1, 2]) },
    null = { Some("null"), Value::Null },
)]
fn payload_argument(arg: Option<&str>, expected: Value) {
    assert_eq!(parse_payload(arg, std::io::empty()).unwrap(), expected);
}

#[test]
fn dash_reads_stdin() {
    let stdin = std::io::Cursor::new(b"{\"done\": true}\n".to_vec());
    assert_eq!(parse_payload(Some("-"), stdin).unwrap(), json!({"done": true}));
}

#[test]
fn malformed_payload_is_rejected() {
    let err = parse_payload(Some("{title: A}"), std::io::empty()).unwrap_err();
    assert!(matches!(err, Error::InvalidPayload(_)));
}

#[test]
fn run_impl_queues_a_pending_record() {
    let ctx = TestContext::new();
    let id = run_impl(&ctx.engine, "todo", "todo-1", Action::Create, &json!({"title": "A"}), OutputFormat::Text)
        .unwrap();

    let record = ctx.engine.queue().get(&id).unwrap();
    assert_eq!(record.status, Status::Pending);
    assert_eq!(record.payload, json!({"title": "A"}));
}

#[test]
fn run_impl_deduplicates_pending_mutations() {
    let ctx = TestContext::new();
    let payload = json!({"title": "A"});
    let a = run_impl(&ctx.engine, "todo", "todo-1", Action::Update, &payload, OutputFormat::Json).unwrap();
    let b = run_impl(&ctx.engine, "todo", "todo-1", Action::Update, &payload, OutputFormat::Json).unwrap();
    assert_eq!(a, b);
    assert_eq!(ctx.engine.queue().counts().unwrap().pending, 1);
}

#[test]
fn run_impl_reports_full_queue() {
    let mut config = crate::config::Config::new("dev1".into());
    config.max_queue_size = 1;
    let ctx = TestContext::with_config(config);
    run_impl(&ctx.engine, "todo", "a", Action::Create, &json!({}), OutputFormat::Text).unwrap();

    let err = run_impl(&ctx.engine, "todo", "b", Action::Create, &json!({}), OutputFormat::Text).unwrap_err();
    assert!(matches!(err, Error::Core(ebb_core::Error::QueueFull { max: 1 })));
}
