// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection and resolution.
//!
//! A conflict starts as a `conflict` rejection from the remote carrying the
//! remote's snapshot of the resource. Comparing the record's clock with the
//! snapshot's decides what happens next:
//!
//! | local vs remote | outcome                                     |
//! |-----------------|---------------------------------------------|
//! | concurrent      | conflict: auto-resolve or park for the host |
//! | remote after    | local mutation superseded, record dropped   |
//! | after or equal  | replay again with a dominating stamp        |
//!
//! Resolving (either way) replaces the record's payload with the chosen
//! snapshot and stamps it past both clocks, so the next replay wins.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use ebb_core::{Action, Causality, QueueStore, Record, Snapshot, VectorClock};

use crate::error::{Error, Result};
use crate::queue::QueueManager;

/// Payload fields holding the record's own modification time, in lookup order.
pub const TIMESTAMP_FIELDS: [&str; 4] = ["updatedAt", "updated_at", "lastModified", "last_modified"];

/// How a local clock relates to the remote's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Conflict,
    Superseded,
    ReplayAsIs,
}

/// What a conflict is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictKind {
    pub resource_type: String,
    pub action: Action,
}

/// Concurrent edits to one resource, awaiting resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Id of the queued record that was rejected.
    pub operation_id: String,
    pub kind: ConflictKind,
    pub resource_id: String,
    pub local: Snapshot,
    pub remote: Snapshot,
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    pub fn new(record: &Record, remote: Snapshot, detected_at: DateTime<Utc>) -> Self {
        Conflict {
            operation_id: record.id.clone(),
            kind: ConflictKind { resource_type: record.resource_type.clone(), action: record.action },
            resource_id: record.resource_id.clone(),
            local: Snapshot { payload: record.payload.clone(), clock: record.clock.clone() },
            remote,
            detected_at,
        }
    }

    pub fn resource_key(&self) -> String {
        ebb_core::resource_key(&self.kind.resource_type, &self.resource_id)
    }
}

/// Which side of a conflict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Local,
    Remote,
}

impl Choice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::Local => "local",
            Choice::Remote => "remote",
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Choice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" | "mine" => Ok(Choice::Local),
            "remote" | "theirs" => Ok(Choice::Remote),
            _ => Err(Error::InvalidChoice(s.to_string())),
        }
    }
}

/// What `handle` did with a conflict rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The remote already holds a later version; the record was dropped.
    Superseded,
    /// The local clock was not behind; the record goes out again.
    Requeued,
    /// Last-write-wins picked a side.
    AutoResolved(Choice),
    /// Left for the host to decide.
    Parked,
}

/// Compares a record's clock with the remote's.
pub fn detect(local: &VectorClock, remote: &VectorClock) -> Detection {
    match local.compare(remote) {
        Causality::Concurrent => Detection::Conflict,
        Causality::Before => Detection::Superseded,
        Causality::After | Causality::Equal => Detection::ReplayAsIs,
    }
}

/// Last-write-wins on the payloads' own timestamps.
///
/// Returns `None` when either side lacks a readable timestamp or both carry
/// the same one.
pub fn auto_resolve(conflict: &Conflict) -> Option<Choice> {
    let local = payload_timestamp(&conflict.local.payload)?;
    let remote = payload_timestamp(&conflict.remote.payload)?;
    match local.cmp(&remote) {
        std::cmp::Ordering::Greater => Some(Choice::Local),
        std::cmp::Ordering::Less => Some(Choice::Remote),
        std::cmp::Ordering::Equal => None,
    }
}

/// Reads a modification time from a payload as epoch milliseconds.
///
/// Accepts RFC 3339 strings and epoch-millisecond numbers.
pub fn payload_timestamp(payload: &Value) -> Option<i64> {
    let value = TIMESTAMP_FIELDS.iter().find_map(|field| payload.get(field))?;
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.timestamp_millis()),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// Routes conflict rejections and holds the ones waiting on the host.
pub struct ConflictResolver {
    auto_resolve: bool,
    parked: Mutex<BTreeMap<String, Conflict>>,
}

impl ConflictResolver {
    pub fn new(auto_resolve: bool) -> Self {
        ConflictResolver { auto_resolve, parked: Mutex::new(BTreeMap::new()) }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Conflict>> {
        self.parked.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handles a conflict rejection for `record`.
    pub fn handle<S: QueueStore>(
        &self,
        queue: &QueueManager<S>,
        record: &Record,
        remote: Snapshot,
    ) -> Result<Resolution> {
        match detect(&record.clock, &remote.clock) {
            Detection::Superseded => {
                queue.observe_clock(&record.resource_key(), &remote.clock)?;
                queue.drop_superseded(&record.id)?;
                Ok(Resolution::Superseded)
            }
            Detection::ReplayAsIs => {
                let stamp = queue.stamp_after(&record.resource_key(), &remote.clock)?;
                queue.requeue(&record.id, record.action, record.payload.clone(), stamp)?;
                info!(id = %record.id, "remote refused a non-conflicting replay, requeued");
                Ok(Resolution::Requeued)
            }
            Detection::Conflict => {
                let conflict = Conflict::new(record, remote, queue.now());
                if self.auto_resolve {
                    if let Some(choice) = auto_resolve(&conflict) {
                        apply(queue, &conflict, choice)?;
                        info!(id = %record.id, %choice, "conflict auto-resolved");
                        return Ok(Resolution::AutoResolved(choice));
                    }
                }
                warn!(id = %record.id, resource = %conflict.resource_key(), "conflict parked for manual resolution");
                self.park(conflict);
                Ok(Resolution::Parked)
            }
        }
    }

    /// Resolves a parked conflict with the host's choice.
    pub fn resolve_manually<S: QueueStore>(
        &self,
        queue: &QueueManager<S>,
        operation_id: &str,
        choice: Choice,
    ) -> Result<Record> {
        let conflict = self
            .lock()
            .remove(operation_id)
            .ok_or_else(|| Error::ConflictNotFound(operation_id.to_string()))?;

        match apply(queue, &conflict, choice) {
            Ok(record) => {
                info!(id = operation_id, %choice, "conflict resolved");
                Ok(record)
            }
            Err(e) => {
                self.park(conflict);
                Err(e)
            }
        }
    }

    /// Parked conflicts, oldest first.
    pub fn pending(&self) -> Vec<Conflict> {
        let mut conflicts: Vec<Conflict> = self.lock().values().cloned().collect();
        conflicts.sort_by(|a, b| a.detected_at.cmp(&b.detected_at).then_with(|| a.operation_id.cmp(&b.operation_id)));
        conflicts
    }

    pub fn get(&self, operation_id: &str) -> Option<Conflict> {
        self.lock().get(operation_id).cloned()
    }

    pub fn is_parked(&self, operation_id: &str) -> bool {
        self.lock().contains_key(operation_id)
    }

    /// Holds a conflict for manual resolution, replacing any earlier one for
    /// the same record.
    pub fn park(&self, conflict: Conflict) {
        self.lock().insert(conflict.operation_id.clone(), conflict);
    }

    /// Reloads conflicts persisted by a previous session.
    pub fn restore(&self, conflicts: impl IntoIterator<Item = Conflict>) -> usize {
        let mut parked = self.lock();
        let before = parked.len();
        for conflict in conflicts {
            parked.insert(conflict.operation_id.clone(), conflict);
        }
        parked.len() - before
    }
}

/// Rewrites the record with the chosen side and a clock past both.
fn apply<S: QueueStore>(queue: &QueueManager<S>, conflict: &Conflict, choice: Choice) -> Result<Record> {
    let (action, payload) = match choice {
        Choice::Local => (conflict.kind.action, conflict.local.payload.clone()),
        Choice::Remote if conflict.remote.payload.is_null() => (Action::Delete, Value::Object(Default::default())),
        Choice::Remote => (Action::Update, conflict.remote.payload.clone()),
    };
    let seen = conflict.local.clock.merge(&conflict.remote.clock);
    let stamp = queue.stamp_after(&conflict.resource_key(), &seen)?;
    Ok(queue.requeue(&conflict.operation_id, action, payload, stamp)?)
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
