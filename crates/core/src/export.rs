// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Export bundle format: `{ version, timestamp, items: [record] }`.
//!
//! Import is two-staged. The container shape is checked first and a bad
//! shape rejects the whole bundle; then every item is validated on its own
//! so one malformed record does not block the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Error, RejectedItem, Result};
use crate::record::{validate, Record};

/// Current bundle format version.
pub const EXPORT_VERSION: &str = "1.0";

/// A full dump of the queue.
///
/// Items are kept untyped so that quarantined records travel with the rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportBundle {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<Value>,
}

impl ExportBundle {
    /// Creates a bundle stamped with the current format version.
    pub fn new(timestamp: DateTime<Utc>, items: Vec<Value>) -> Self {
        ExportBundle { version: EXPORT_VERSION.to_string(), timestamp, items }
    }

    /// Serializes the bundle as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Checks the container shape and returns the raw items.
pub fn parse_container(value: &Value) -> Result<&[Value]> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::InvalidBundle("expected a JSON object".into()))?;

    let version = obj
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidBundle("missing string field 'version'".into()))?;
    let major = version.split('.').next().unwrap_or_default();
    if major != "1" {
        return Err(Error::InvalidBundle(format!("unsupported version '{version}'")));
    }

    obj.get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::InvalidBundle("missing array field 'items'".into()))
}

/// Parses bundle text and checks its container shape.
pub fn parse_text(text: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidBundle(format!("not JSON: {e}")))?;
    parse_container(&value)?;
    Ok(value)
}

/// Validates items one by one.
///
/// Returns the valid records and the rejects; a repeated id is rejected
/// after its first occurrence.
pub fn validate_items(items: &[Value]) -> (Vec<Record>, Vec<RejectedItem>) {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match validate(item) {
            Ok(record) => {
                if seen.insert(record.id.clone()) {
                    valid.push(record);
                } else {
                    rejected.push(RejectedItem {
                        index,
                        id: Some(record.id),
                        reason: "duplicate id".into(),
                    });
                }
            }
            Err(e) => {
                let (id, reason) = match e {
                    Error::Validation { id, reason } => (id, reason),
                    other => (None, other.to_string()),
                };
                let id = id.or_else(|| item.get("id").and_then(Value::as_str).map(str::to_string));
                rejected.push(RejectedItem { index, id, reason });
            }
        }
    }

    (valid, rejected)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
