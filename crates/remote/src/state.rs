// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Holds the latest snapshot of every resource and the acknowledgements of
//! every applied replay, behind a single async mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ebb_core::{
    jsonl, resource_key, Action, Causality, Rejection, RejectionKind, ReplayAck, ReplayRequest,
    Result, Snapshot,
};

const JOURNAL_FILE_NAME: &str = "replays.jsonl";

/// Admission limits for replays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Bearer token every replay must carry, if set.
    pub token: Option<String>,
    pub max_payload_bytes: usize,
}

impl ServerOptions {
    pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions { token: None, max_payload_bytes: Self::DEFAULT_MAX_PAYLOAD_BYTES }
    }
}

/// One applied replay as written to the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JournalEntry {
    request: ReplayRequest,
    ack: ReplayAck,
}

#[derive(Default)]
struct Resources {
    /// Latest snapshot per resource key. Deletes leave a `null` payload.
    snapshots: HashMap<String, Snapshot>,
    /// Acknowledgement per applied record id.
    applied: HashMap<String, ReplayAck>,
    next_server_id: u64,
}

/// A replay that passed the causality check but is not stored yet.
struct Accepted {
    key: String,
    snapshot: Snapshot,
    ack: ReplayAck,
}

impl Resources {
    fn apply(&mut self, request: &ReplayRequest) -> std::result::Result<ReplayAck, Rejection> {
        if let Some(ack) = self.applied.get(&request.record_id) {
            debug!(record = %request.record_id, "duplicate replay");
            return Ok(ack.clone());
        }
        let accepted = self.accept(request)?;
        Ok(self.commit(&request.record_id, accepted))
    }

    /// Checks `request` against the stored clock without changing anything.
    fn accept(&self, request: &ReplayRequest) -> std::result::Result<Accepted, Rejection> {
        let key = resource_key(&request.resource_type, &request.resource_id);
        let clock = match self.snapshots.get(&key) {
            None => request.clock.clone(),
            Some(stored) => match request.clock.compare(&stored.clock) {
                Causality::After | Causality::Equal => request.clock.merge(&stored.clock),
                Causality::Before | Causality::Concurrent => {
                    return Err(Rejection::conflict(
                        format!("{key} changed since clock {}", request.clock),
                        stored.clone(),
                    ));
                }
            },
        };

        let payload = match request.action {
            Action::Delete => serde_json::Value::Null,
            Action::Create | Action::Update => request.payload.clone(),
        };
        let ack = ReplayAck {
            server_id: Some(format!("srv-{}", self.next_server_id + 1)),
            clock: Some(clock.clone()),
        };
        Ok(Accepted { key, snapshot: Snapshot { payload, clock }, ack })
    }

    fn commit(&mut self, record_id: &str, accepted: Accepted) -> ReplayAck {
        self.next_server_id += 1;
        self.snapshots.insert(accepted.key, accepted.snapshot);
        self.applied.insert(record_id.to_string(), accepted.ack.clone());
        accepted.ack
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    resources: Mutex<Resources>,
    options: ServerOptions,
    /// Replay journal, when the server has a data directory.
    journal: Option<PathBuf>,
}

impl ServerState {
    /// Creates a state that lives only as long as the process.
    pub fn in_memory(options: ServerOptions) -> Self {
        Self::with_resources(Resources::default(), options, None)
    }

    /// Opens a state journaled in `data_dir`, replaying earlier entries.
    pub fn open(data_dir: &Path, options: ServerOptions) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let journal = data_dir.join(JOURNAL_FILE_NAME);

        let mut resources = Resources::default();
        let entries: Vec<JournalEntry> = jsonl::read_all(&journal)?;
        for entry in &entries {
            if let Err(rejection) = resources.apply(&entry.request) {
                warn!(record = %entry.request.record_id, %rejection, "journal entry no longer applies");
            }
        }
        info!(replays = entries.len(), "journal loaded");

        Ok(Self::with_resources(resources, options, Some(journal)))
    }

    fn with_resources(resources: Resources, options: ServerOptions, journal: Option<PathBuf>) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner { resources: Mutex::new(resources), options, journal }),
        }
    }

    /// Admits and applies one replay.
    ///
    /// Replaying a record id that was already applied returns the original
    /// acknowledgement without a second effect.
    pub async fn replay(
        &self,
        token: Option<&str>,
        request: &ReplayRequest,
    ) -> std::result::Result<ReplayAck, Rejection> {
        let options = &self.inner.options;
        if let Some(expected) = &options.token {
            if token != Some(expected.as_str()) {
                return Err(Rejection::new(RejectionKind::Unauthorized, "missing or invalid token"));
            }
        }
        let size = request.payload_len();
        if size > options.max_payload_bytes {
            return Err(Rejection::new(
                RejectionKind::PayloadTooLarge,
                format!("payload is {size} bytes, limit is {}", options.max_payload_bytes),
            ));
        }

        let mut resources = self.inner.resources.lock().await;
        if let Some(ack) = resources.applied.get(&request.record_id) {
            debug!(record = %request.record_id, "duplicate replay");
            return Ok(ack.clone());
        }
        let accepted = resources.accept(request)?;

        // Nothing is applied in memory unless the journal took the entry.
        if let Some(journal) = &self.inner.journal {
            let entry = JournalEntry { request: request.clone(), ack: accepted.ack.clone() };
            jsonl::append(journal, &entry).map_err(|e| {
                warn!(record = %request.record_id, error = %e, "journal append failed");
                Rejection::new(RejectionKind::Server, format!("journal: {e}"))
            })?;
        }
        let ack = resources.commit(&request.record_id, accepted);
        debug!(record = %request.record_id, action = %request.action, "replay applied");
        Ok(ack)
    }

    /// Current snapshot of a resource, if the server has seen it.
    pub async fn snapshot(&self, resource_type: &str, resource_id: &str) -> Option<Snapshot> {
        let resources = self.inner.resources.lock().await;
        resources.snapshots.get(&resource_key(resource_type, resource_id)).cloned()
    }

    /// Number of distinct replays applied.
    pub async fn applied_count(&self) -> usize {
        self.inner.resources.lock().await.applied.len()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
