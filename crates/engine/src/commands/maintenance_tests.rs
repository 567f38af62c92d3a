// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use crate::error::Error;
use ebb_core::Action;
use serde_json::json;

#[test]
fn retry_named_records() {
    let ctx = TestContext::new();
    let a = ctx.failed("a");
    let b = ctx.failed("b");

    let retried = retry_impl(&ctx.engine, std::slice::from_ref(&a.id), false).unwrap();
    assert_eq!(retried, vec![a.id.clone()]);

    let queue = ctx.engine.queue();
    assert_eq!(queue.get(&a.id).unwrap().status, Status::Pending);
    assert_eq!(queue.get(&b.id).unwrap().status, Status::Failed);
}

#[test]
fn retry_all_failed() {
    let ctx = TestContext::new();
    ctx.failed("a");
    ctx.failed("b");
    ctx.enqueue("todo", "c", Action::Create, json!({}));

    let retried = retry_impl(&ctx.engine, &[], true).unwrap();
    assert_eq!(retried.len(), 2);
    assert_eq!(ctx.engine.queue().counts().unwrap().pending, 3);
}

#[test]
fn retry_refuses_pending_record() {
    let ctx = TestContext::new();
    let record = ctx.enqueue("todo", "c", Action::Create, json!({}));
    let err = retry_impl(&ctx.engine, &[record.id], false).unwrap_err();
    assert!(matches!(err, Error::Core(ebb_core::Error::InvalidTransition { .. })));
}
