// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    not_found = { Error::RecordNotFound("op-123".into()), "op-123" },
    queue_full = { Error::QueueFull { max: 10 }, "10 records" },
    retry_limit = { Error::RetryLimit { id: "op-1".into(), retries: 5 }, "ebb retry op-1" },
    bad_bundle = { Error::InvalidBundle("missing items".into()), "missing items" },
    validation_with_id = { Error::Validation { id: Some("op-7".into()), reason: "empty id".into() }, "invalid record 'op-7': empty id" },
    validation_without_id = { Error::Validation { id: None, reason: "not an object".into() }, "invalid record: not an object" },
)]
fn error_display_contains(err: Error, expected: &str) {
    let msg = err.to_string();
    assert!(msg.contains(expected), "{msg}");
}

#[test]
fn error_invalid_transition_display() {
    let err = Error::InvalidTransition {
        id: "op-1".into(),
        from: Status::Completed,
        to: Status::Pending,
    };
    let msg = err.to_string();
    assert!(msg.contains("completed"));
    assert!(msg.contains("pending"));
}

#[test]
fn partial_import_lists_rejects() {
    let err = Error::PartialImport {
        imported: 2,
        rejected: vec![
            RejectedItem { index: 1, id: Some("op-b".into()), reason: "missing field 'payload'".into() },
            RejectedItem { index: 3, id: None, reason: "record is not an object".into() },
        ],
    };
    let msg = err.to_string();
    assert!(msg.contains("2 imported, 2 rejected"));
    assert!(msg.contains("#1 (op-b)"));
    assert!(msg.contains("#3: record is not an object"));
}

#[test]
fn disk_full_maps_to_storage_exhausted() {
    let sqlite_err = rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
        Some("database or disk is full".into()),
    );
    let err: Error = sqlite_err.into();
    assert!(err.is_storage_exhausted());
}

#[test]
fn other_sqlite_errors_stay_database_errors() {
    let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, Error::Database(_)));
    assert!(!err.is_storage_exhausted());
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
