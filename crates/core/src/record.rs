// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operation records: the durable unit of the offline queue.
//!
//! A record is an opaque pending mutation against one resource. The engine
//! never looks inside the payload except to find a timestamp field when
//! resolving conflicts by last-write-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::clock::{resource_key, VectorClock};
use crate::error::{Error, Result};

/// Kind of mutation a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    /// All actions, in the order accepted on the wire.
    pub const ALL: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Priority contribution of the action; lower is more urgent.
    ///
    /// Deletes go first, then updates, then creates.
    pub fn weight(&self) -> i64 {
        match self {
            Action::Delete => 1,
            Action::Update => 2,
            Action::Create => 3,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting to be replayed.
    Pending,
    /// Handed to the remote; outcome not yet known.
    Processing,
    /// Replayed successfully.
    Completed,
    /// Failed and not retried automatically.
    Failed,
    /// Failed with a retry scheduled at `next_attempt_at`.
    Retrying,
}

impl Status {
    /// All statuses.
    pub const ALL: [Status; 5] = [
        Status::Pending,
        Status::Processing,
        Status::Completed,
        Status::Failed,
        Status::Retrying,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Retrying => "retrying",
        }
    }

    /// Check if a transition from this status to target is valid.
    ///
    /// `Processing -> Pending` covers conflict requeues and crash recovery;
    /// `Failed -> Pending` is the explicit host retry.
    pub fn can_transition_to(&self, target: Status) -> bool {
        matches!(
            (self, target),
            (Status::Pending, Status::Processing)
                | (Status::Retrying, Status::Processing)
                | (Status::Processing, Status::Completed)
                | (Status::Processing, Status::Failed)
                | (Status::Processing, Status::Retrying)
                | (Status::Processing, Status::Pending)
                | (Status::Failed, Status::Pending)
                | (Status::Failed, Status::Retrying)
        )
    }

    /// Returns true if the record will not be picked up again on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "processing" => Ok(Status::Processing),
            "completed" => Ok(Status::Completed),
            "failed" => Ok(Status::Failed),
            "retrying" => Ok(Status::Retrying),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A pending mutation waiting to be replayed against the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Unique identifier, assigned at enqueue time.
    pub id: String,
    /// Application resource kind (e.g. `todo`).
    pub resource_type: String,
    /// Identity of the targeted resource.
    pub resource_id: String,
    pub action: Action,
    /// Resource-shaped data, opaque to the engine.
    pub payload: Value,
    /// Vector clock stamped for this mutation.
    #[serde(default)]
    pub clock: VectorClock,
    pub created_at: DateTime<Utc>,
    /// Lower is processed first.
    pub priority: i64,
    #[serde(default)]
    pub retry_count: u32,
    pub status: Status,
    /// Last failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When a `retrying` record becomes eligible again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

impl Record {
    /// Creates a fresh pending record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        resource_type: String,
        resource_id: String,
        action: Action,
        payload: Value,
        clock: VectorClock,
        created_at: DateTime<Utc>,
        priority: i64,
    ) -> Self {
        Record {
            id,
            resource_type,
            resource_id,
            action,
            payload,
            clock,
            created_at,
            priority,
            retry_count: 0,
            status: Status::Pending,
            error: None,
            next_attempt_at: None,
            completed_at: None,
            processing_time_ms: None,
        }
    }

    /// Returns the key this record's resource clock is filed under.
    pub fn resource_key(&self) -> String {
        resource_key(&self.resource_type, &self.resource_id)
    }

    /// Returns true if the record can be dequeued at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            Status::Pending => true,
            Status::Retrying => self.next_attempt_at.is_none_or(|at| at <= now),
            _ => false,
        }
    }

    /// Returns true if the record has not reached a terminal status.
    ///
    /// Later records for the same resource wait behind an unfinished one.
    pub fn is_unfinished(&self) -> bool {
        matches!(self.status, Status::Pending | Status::Retrying | Status::Processing)
    }

    /// Returns true if this record is still pending with the given mutation.
    ///
    /// Clock, timestamps, and retry bookkeeping are not compared.
    pub fn is_pending_mutation(&self, resource_type: &str, resource_id: &str, action: Action, payload: &Value) -> bool {
        self.status == Status::Pending
            && self.resource_type == resource_type
            && self.resource_id == resource_id
            && self.action == action
            && self.payload == *payload
    }

    /// Ordering used by the queue: priority, then age, then id.
    pub fn queue_order(&self, other: &Record) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

const REQUIRED_FIELDS: [&str; 8] = [
    "id",
    "resource_type",
    "resource_id",
    "action",
    "payload",
    "created_at",
    "priority",
    "status",
];

fn invalid(id: Option<&str>, reason: impl Into<String>) -> Error {
    Error::Validation { id: id.map(str::to_string), reason: reason.into() }
}

/// Structural check of an untyped record.
///
/// Verifies required fields are present, `action` and `status` are in their
/// allowed sets and the id is non-empty, then decodes the record.
pub fn validate(value: &Value) -> Result<Record> {
    let obj = value.as_object().ok_or_else(|| invalid(None, "record is not an object"))?;
    let id = obj.get("id").and_then(Value::as_str);

    for field in REQUIRED_FIELDS {
        match obj.get(field) {
            None | Some(Value::Null) => {
                return Err(invalid(id, format!("missing field '{field}'")));
            }
            Some(_) => {}
        }
    }

    let id = id.ok_or_else(|| invalid(None, "field 'id' is not a string"))?;
    if id.trim().is_empty() {
        return Err(invalid(None, "empty id"));
    }

    for (field, allowed) in [
        ("action", Action::ALL.iter().map(Action::as_str).collect::<Vec<_>>()),
        ("status", Status::ALL.iter().map(Status::as_str).collect::<Vec<_>>()),
    ] {
        let raw = &obj[field];
        if !raw.as_str().is_some_and(|text| allowed.contains(&text)) {
            let shown = raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string());
            return Err(invalid(Some(id), format!("invalid {field} '{shown}'")));
        }
    }

    for field in ["resource_type", "resource_id"] {
        if obj.get(field).and_then(Value::as_str).is_none_or(|s| s.trim().is_empty()) {
            return Err(invalid(Some(id), format!("field '{field}' must be a non-empty string")));
        }
    }

    serde_json::from_value(value.clone()).map_err(|e| invalid(Some(id), e.to_string()))
}

/// Parses and validates a stored JSON body.
pub fn validate_body(body: &str) -> Result<Record> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| invalid(None, format!("unreadable body: {e}")))?;
    validate(&value)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
