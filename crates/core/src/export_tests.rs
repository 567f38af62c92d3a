// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::Action;
use serde_json::json;
use yare::parameterized;

fn item(id: &str) -> Value {
    let record = Record::new(
        id.to_string(),
        "todo".into(),
        "todo-1".into(),
        Action::Create,
        json!({"title": "A"}),
        "dev1:1".parse().unwrap(),
        Utc::now(),
        13,
    );
    serde_json::to_value(record).unwrap()
}

#[test]
fn new_bundle_uses_current_version() {
    let bundle = ExportBundle::new(Utc::now(), vec![item("op-1")]);
    assert_eq!(bundle.version, EXPORT_VERSION);
    let text = bundle.to_json_pretty().unwrap();
    let parsed = parse_text(&text).unwrap();
    assert_eq!(parse_container(&parsed).unwrap().len(), 1);
}

#[parameterized(
    array = { json!([]), "expected a JSON object" },
    no_version = { json!({"items": []}), "version" },
    numeric_version = { json!({"version": 1, "items": []}), "version" },
    future_version = { json!({"version": "2.0", "items": []}), "unsupported version '2.0'" },
    no_items = { json!({"version": "1.0"}), "items" },
    items_not_array = { json!({"version": "1.0", "items": {}}), "items" },
)]
fn container_shape_errors(value: Value, expected: &str) {
    let err = parse_container(&value).unwrap_err();
    assert!(matches!(err, Error::InvalidBundle(_)));
    assert!(err.to_string().contains(expected), "{err}");
}

#[test]
fn minor_versions_are_accepted() {
    let value = json!({"version": "1.3", "timestamp": "2026-01-01T00:00:00Z", "items": []});
    assert!(parse_container(&value).unwrap().is_empty());
}

#[test]
fn garbage_text_is_invalid_bundle() {
    assert!(matches!(parse_text("{{{").unwrap_err(), Error::InvalidBundle(_)));
}

#[test]
fn two_valid_one_malformed() {
    let mut malformed = item("op-3");
    malformed.as_object_mut().unwrap().remove("payload");
    let items = vec![item("op-1"), item("op-2"), malformed];

    let (valid, rejected) = validate_items(&items);
    assert_eq!(valid.len(), 2);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].index, 2);
    assert_eq!(rejected[0].id.as_deref(), Some("op-3"));
    assert!(rejected[0].reason.contains("payload"));
}

#[test]
fn duplicate_ids_keep_first() {
    let (valid, rejected) = validate_items(&[item("op-1"), item("op-1")]);
    assert_eq!(valid.len(), 1);
    assert_eq!(rejected[0].index, 1);
    assert_eq!(rejected[0].reason, "duplicate id");
}

#[test]
fn non_object_item_has_no_id() {
    let (_, rejected) = validate_items(&[json!("just a string")]);
    assert_eq!(rejected[0].id, None);
}
