// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use crate::config::journal_path;
use crate::conflict::Conflict;
use crate::error::Error;
use crate::test_helpers::MockRemote;
use ebb_core::{jsonl, Action, Rejection, RejectionKind, Snapshot, Status, VectorClock};
use serde_json::json;

fn remote_conflict() -> Rejection {
    let mut clock = VectorClock::new();
    clock.set("dev2", 1);
    Rejection::conflict("stale", Snapshot { payload: json!({"title": "B"}), clock })
}

#[tokio::test]
async fn sync_replays_due_records() {
    let ctx = TestContext::new();
    let a = ctx.enqueue("todo", "a", Action::Create, json!({"title": "A"}));
    let b = ctx.enqueue("todo", "b", Action::Create, json!({"title": "B"}));
    let remote = MockRemote::new();

    let report = sync_impl(&ctx.engine, remote.clone(), false).await.unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(remote.replayed_ids(), vec![a.id.clone(), b.id.clone()]);
    assert_eq!(ctx.engine.queue().get(&a.id).unwrap().status, Status::Completed);
}

#[tokio::test]
async fn sync_writes_parked_conflicts_to_the_journal() {
    let ctx = TestContext::new();
    let record = ctx.enqueue("todo", "todo-1", Action::Update, json!({"title": "A"}));
    let remote = MockRemote::new();
    remote.push(Err(remote_conflict()));

    let report = sync_impl(&ctx.engine, remote, false).await.unwrap();
    assert_eq!(report.conflicts, 1);

    let journal: Vec<Conflict> = jsonl::read_all(&journal_path(ctx.dir.path())).unwrap();
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].operation_id, record.id);
}

#[tokio::test]
async fn sync_skips_when_offline_unless_forced() {
    let ctx = TestContext::new();
    ctx.enqueue("todo", "a", Action::Create, json!({}));
    ctx.engine.monitor().set_online(false);
    let remote = MockRemote::new();

    let report = sync_impl(&ctx.engine, remote.clone(), false).await.unwrap();
    assert_eq!(report.skipped, Some(SkipReason::Offline));
    assert!(remote.requests().is_empty());

    let report = sync_impl(&ctx.engine, remote.clone(), true).await.unwrap();
    assert_eq!(report.completed, 1);
}

#[tokio::test]
async fn sync_surfaces_auth_failure() {
    let ctx = TestContext::new();
    let record = ctx.enqueue("todo", "a", Action::Create, json!({}));
    let remote = MockRemote::new();
    remote.push(Err(Rejection::new(RejectionKind::Unauthorized, "bad token")));

    let err = sync_impl(&ctx.engine, remote, false).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(ctx.engine.queue().get(&record.id).unwrap().status, Status::Failed);
}

#[tokio::test]
async fn run_loop_drains_the_queue_and_stops() {
    let ctx = TestContext::new();
    let a = ctx.enqueue("todo", "a", Action::Create, json!({}));
    let b = ctx.enqueue("todo", "b", Action::Update, json!({"n": 1}));
    let remote = MockRemote::new();

    let stop = tokio::time::sleep(Duration::from_millis(500));
    run_loop_impl(&ctx.engine, remote.clone(), Duration::from_secs(1), stop).await.unwrap();

    assert_eq!(remote.requests().len(), 2);
    for id in [&a.id, &b.id] {
        assert_eq!(ctx.engine.queue().get(id).unwrap().status, Status::Completed);
    }
}

#[test]
fn report_text() {
    let report = CycleReport {
        attempted: 3,
        completed: 1,
        retrying: 1,
        conflicts: 1,
        error: Some("server: busy".into()),
        ..CycleReport::default()
    };
    assert_eq!(
        format_report(&report),
        "Replayed 1 of 3 attempted, 1 retrying, 1 conflicts\nlast error: server: busy"
    );

    let skipped = CycleReport { skipped: Some(SkipReason::Offline), ..CycleReport::default() };
    assert!(format_report(&skipped).starts_with("Sync skipped: remote unreachable"));
}
