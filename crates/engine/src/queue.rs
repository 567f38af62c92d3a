// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue manager: the only writer of record lifecycle state.
//!
//! Wraps a [`QueueStore`] in a mutex so every read-modify-write of a record
//! is serialized. Records whose stored body fails validation are
//! quarantined: they never reach `dequeue_batch`, are listed by
//! [`QueueManager::corrupted`], and are only removed on explicit request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use ebb_core::export::{parse_container, validate_items};
use ebb_core::id::generate_unique_id;
use ebb_core::record::validate_body;
use ebb_core::{
    resource_key, Action, ClockAuthority, ClockSource, Error, ExportBundle, QueueStore, Record,
    Result, Status, VectorClock,
};

use crate::config::PriorityWeights;

/// Limits and weights the queue manager enforces.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Enqueue is refused once this many records are stored.
    pub max_queue_size: usize,
    /// Retries allowed before a record fails terminally.
    pub max_retries: u32,
    /// Completed records older than this are removed by `compact`.
    pub cleanup_age: Duration,
    pub priorities: PriorityWeights,
}

impl Default for QueueOptions {
    fn default() -> Self {
        QueueOptions {
            max_queue_size: 1000,
            max_retries: 5,
            cleanup_age: Duration::from_secs(7 * 24 * 60 * 60),
            priorities: PriorityWeights::default(),
        }
    }
}

/// A stored record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Corrupted {
    pub id: String,
    pub reason: String,
    /// The stored body, verbatim.
    pub body: String,
}

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub retrying: usize,
    pub corrupted: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed + self.retrying + self.corrupted
    }
}

/// Validates, orders and transitions queued records.
pub struct QueueManager<S: QueueStore> {
    store: Mutex<S>,
    authority: Arc<ClockAuthority>,
    clock: Arc<dyn ClockSource>,
    options: QueueOptions,
    seq: AtomicU64,
    last_created_ms: AtomicU64,
}

impl<S: QueueStore> QueueManager<S> {
    /// Opens a manager over a store, seeding a clock authority for
    /// `device_id` from the clocks the store has persisted.
    pub fn open(
        store: S,
        device_id: &str,
        clock: Arc<dyn ClockSource>,
        options: QueueOptions,
    ) -> Result<Self> {
        let authority = Arc::new(ClockAuthority::with_clocks(device_id, store.clocks()?));
        Self::new(store, authority, clock, options)
    }

    /// Creates a manager with an existing clock authority.
    pub fn new(
        store: S,
        authority: Arc<ClockAuthority>,
        clock: Arc<dyn ClockSource>,
        options: QueueOptions,
    ) -> Result<Self> {
        let (records, _) = load(&store)?;
        let last_created_ms = records
            .iter()
            .map(|r| r.created_at.timestamp_millis().max(0) as u64)
            .max()
            .unwrap_or(0);

        Ok(QueueManager {
            store: Mutex::new(store),
            authority,
            clock,
            options,
            seq: AtomicU64::new(0),
            last_created_ms: AtomicU64::new(last_created_ms),
        })
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn max_retries(&self) -> u32 {
        self.options.max_retries
    }

    /// The clock authority stamping this queue's records.
    pub fn authority(&self) -> &Arc<ClockAuthority> {
        &self.authority
    }

    /// Current time according to the injected clock source.
    pub fn now(&self) -> DateTime<Utc> {
        millis_to_datetime(self.clock.now_ms())
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Next creation timestamp; strictly increasing within this manager.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = self.clock.now_ms();
        let prev = match self.last_created_ms.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        }) {
            Ok(prev) | Err(prev) => prev,
        };
        millis_to_datetime(now.max(prev + 1))
    }

    /// Adds a mutation to the queue and returns its record id.
    ///
    /// An identical mutation that is still pending is not queued twice; its
    /// id is returned instead. A `null` payload is stored as `{}`.
    pub fn enqueue<P: Serialize + ?Sized>(
        &self,
        resource_type: &str,
        resource_id: &str,
        action: Action,
        payload: &P,
    ) -> Result<String> {
        for (field, value) in [("resource_type", resource_type), ("resource_id", resource_id)] {
            if value.trim().is_empty() {
                return Err(Error::Validation {
                    id: None,
                    reason: format!("field '{field}' must be a non-empty string"),
                });
            }
        }
        let mut payload = serde_json::to_value(payload)?;
        if payload.is_null() {
            payload = Value::Object(serde_json::Map::new());
        }

        let mut store = self.lock();
        let (records, _) = load(&*store)?;
        if let Some(existing) = records
            .iter()
            .find(|r| r.is_pending_mutation(resource_type, resource_id, action, &payload))
        {
            debug!(id = %existing.id, "mutation already pending");
            return Ok(existing.id.clone());
        }

        let max = self.options.max_queue_size;
        if store.len()? >= max {
            warn!(max, "queue full, refusing enqueue");
            return Err(Error::QueueFull { max });
        }

        let key = resource_key(resource_type, resource_id);
        let clock = self.authority.tick(&key);
        store.put_clock(&key, &clock)?;

        let created_at = self.next_created_at();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let id = generate_unique_id(self.authority.device_id(), &key, &created_at, seq, |candidate| {
            matches!(store.get(candidate), Ok(Some(_)))
        });
        let priority = self.options.priorities.weight(resource_type) + action.weight();

        let record = Record::new(
            id.clone(),
            resource_type.to_string(),
            resource_id.to_string(),
            action,
            payload,
            clock,
            created_at,
            priority,
        );
        store.put(&record)?;
        info!(id = %id, resource = %key, action = %action, priority, "enqueued");
        Ok(id)
    }

    /// Returns up to `limit` records ready for replay, in queue order.
    ///
    /// Ready means `pending`, or `retrying` with `next_attempt_at` passed,
    /// and no older unfinished record for the same resource. Priority orders
    /// records across resources; within one resource, creation order wins.
    pub fn dequeue_batch(&self, limit: usize) -> Result<Vec<Record>> {
        let now = self.now();
        let store = self.lock();
        let (mut records, corrupted) = load(&*store)?;
        if !corrupted.is_empty() {
            debug!(count = corrupted.len(), "skipping corrupted records");
        }
        let heads = resource_heads(&records);
        records.retain(|r| r.is_due(now) && heads.get(&r.resource_key()) == Some(&r.id));
        records.sort_by(|a, b| a.queue_order(b));
        records.truncate(limit);
        Ok(records)
    }

    /// Structural check of an untyped record.
    pub fn validate(&self, value: &Value) -> Result<Record> {
        ebb_core::record::validate(value)
    }

    /// Reads one record.
    pub fn get(&self, id: &str) -> Result<Record> {
        read(&*self.lock(), id)
    }

    /// All valid records in queue order.
    pub fn list(&self) -> Result<Vec<Record>> {
        let (mut records, _) = load(&*self.lock())?;
        records.sort_by(|a, b| a.queue_order(b));
        Ok(records)
    }

    /// Records that failed validation.
    pub fn corrupted(&self) -> Result<Vec<Corrupted>> {
        Ok(load(&*self.lock())?.1)
    }

    pub fn counts(&self) -> Result<QueueCounts> {
        let (records, corrupted) = load(&*self.lock())?;
        let mut counts = QueueCounts { corrupted: corrupted.len(), ..QueueCounts::default() };
        for record in &records {
            match record.status {
                Status::Pending => counts.pending += 1,
                Status::Processing => counts.processing += 1,
                Status::Completed => counts.completed += 1,
                Status::Failed => counts.failed += 1,
                Status::Retrying => counts.retrying += 1,
            }
        }
        Ok(counts)
    }

    /// Earliest `next_attempt_at` among retrying records.
    pub fn next_retry_at(&self) -> Result<Option<DateTime<Utc>>> {
        let (records, _) = load(&*self.lock())?;
        Ok(records
            .iter()
            .filter(|r| r.status == Status::Retrying)
            .filter_map(|r| r.next_attempt_at)
            .min())
    }

    /// Reads a record, applies `f`, and writes it back if `f` returns true.
    fn update<F>(&self, id: &str, f: F) -> Result<Record>
    where
        F: FnOnce(&mut Record) -> Result<bool>,
    {
        let mut store = self.lock();
        let mut record = read(&*store, id)?;
        if f(&mut record)? {
            store.put(&record)?;
        }
        Ok(record)
    }

    pub fn mark_processing(&self, id: &str) -> Result<Record> {
        self.update(id, |record| {
            check_transition(record, Status::Processing)?;
            record.status = Status::Processing;
            Ok(true)
        })
    }

    /// Marks a record replayed. A second call is a no-op.
    pub fn mark_completed(&self, id: &str, processing_time_ms: u64) -> Result<Record> {
        let now = self.now();
        self.update(id, |record| {
            if record.status == Status::Completed {
                return Ok(false);
            }
            check_transition(record, Status::Completed)?;
            record.status = Status::Completed;
            record.completed_at = Some(now);
            record.processing_time_ms = Some(processing_time_ms);
            record.error = None;
            record.next_attempt_at = None;
            Ok(true)
        })
    }

    /// Marks a record terminally failed. `retry_count` is left as is.
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<Record> {
        self.update(id, |record| {
            check_transition(record, Status::Failed)?;
            record.status = Status::Failed;
            record.error = Some(error.to_string());
            record.next_attempt_at = None;
            Ok(true)
        })
    }

    /// Schedules another attempt after `delay`, counting it against
    /// `max_retries`.
    pub fn schedule_retry(&self, id: &str, delay: Duration, error: &str) -> Result<Record> {
        let now = self.now();
        let max_retries = self.options.max_retries;
        self.update(id, |record| {
            if record.retry_count >= max_retries {
                return Err(Error::RetryLimit { id: record.id.clone(), retries: record.retry_count });
            }
            check_transition(record, Status::Retrying)?;
            let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
            record.retry_count += 1;
            record.status = Status::Retrying;
            record.error = Some(error.to_string());
            record.next_attempt_at = Some(now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC));
            Ok(true)
        })
    }

    /// Host-requested retry of a failed record: back to pending with a
    /// fresh retry budget.
    pub fn retry(&self, id: &str) -> Result<Record> {
        self.update(id, |record| {
            if record.status != Status::Failed {
                return Err(Error::InvalidTransition {
                    id: record.id.clone(),
                    from: record.status,
                    to: Status::Pending,
                });
            }
            record.status = Status::Pending;
            record.retry_count = 0;
            record.error = None;
            record.next_attempt_at = None;
            info!(id = %record.id, "failed record reset for retry");
            Ok(true)
        })
    }

    /// Replaces a record's mutation after conflict resolution and returns it
    /// to `pending`.
    pub fn requeue(
        &self,
        id: &str,
        action: Action,
        payload: Value,
        clock: VectorClock,
    ) -> Result<Record> {
        self.update(id, |record| {
            if record.status != Status::Pending {
                check_transition(record, Status::Pending)?;
            }
            record.status = Status::Pending;
            record.action = action;
            record.payload = payload;
            record.clock = clock;
            record.error = None;
            record.next_attempt_at = None;
            Ok(true)
        })
    }

    /// Deletes a record whose mutation the remote already superseded.
    pub fn drop_superseded(&self, id: &str) -> Result<()> {
        let mut store = self.lock();
        if !store.delete(id)? {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        info!(id, "dropped superseded record");
        Ok(())
    }

    /// Merges a clock learned from the remote and persists the result.
    pub fn observe_clock(&self, key: &str, seen: &VectorClock) -> Result<VectorClock> {
        let merged = self.authority.observe(key, seen);
        self.lock().put_clock(key, &merged)?;
        Ok(merged)
    }

    /// Produces and persists a stamp dominating both local history and `seen`.
    pub fn stamp_after(&self, key: &str, seen: &VectorClock) -> Result<VectorClock> {
        let stamp = self.authority.observe_and_tick(key, seen);
        self.lock().put_clock(key, &stamp)?;
        Ok(stamp)
    }

    /// Removes completed records older than the configured cleanup age.
    pub fn compact(&self) -> Result<usize> {
        let age = chrono::Duration::from_std(self.options.cleanup_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = self.now().checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let removed = self.delete_where(|r| {
            r.status == Status::Completed && r.completed_at.unwrap_or(r.created_at) < cutoff
        })?;
        if removed > 0 {
            info!(removed, "compacted completed records");
        }
        Ok(removed)
    }

    /// Removes terminally failed records.
    pub fn clear_failed(&self) -> Result<usize> {
        let removed = self.delete_where(|r| r.status == Status::Failed)?;
        info!(removed, "cleared failed records");
        Ok(removed)
    }

    /// Removes a quarantined record.
    pub fn discard_corrupted(&self, id: &str) -> Result<()> {
        let mut store = self.lock();
        let (_, corrupted) = load(&*store)?;
        if !corrupted.iter().any(|c| c.id == id) {
            return Err(Error::RecordNotFound(id.to_string()));
        }
        store.delete(id)?;
        warn!(id, "discarded corrupted record");
        Ok(())
    }

    fn delete_where(&self, pred: impl Fn(&Record) -> bool) -> Result<usize> {
        let mut store = self.lock();
        let (records, _) = load(&*store)?;
        let mut removed = 0;
        for record in records.iter().filter(|r| pred(r)) {
            if store.delete(&record.id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Returns `processing` records to `pending` after a crash.
    ///
    /// Records for which `keep` returns true (e.g. parked conflicts) stay.
    pub fn recover_interrupted(&self, keep: impl Fn(&str) -> bool) -> Result<usize> {
        let mut store = self.lock();
        let (records, _) = load(&*store)?;
        let mut recovered = 0;
        for mut record in records {
            if record.status == Status::Processing && !keep(&record.id) {
                record.status = Status::Pending;
                store.put(&record)?;
                recovered += 1;
            }
        }
        if recovered > 0 {
            warn!(recovered, "recovered records interrupted mid-replay");
        }
        Ok(recovered)
    }

    /// Dumps every record, quarantined ones included, as an export bundle.
    pub fn export_all(&self) -> Result<ExportBundle> {
        let store = self.lock();
        let mut items = Vec::new();
        for stored in store.get_all()? {
            let item = match serde_json::from_str::<Value>(&stored.body) {
                Ok(value) => value,
                Err(_) => Value::String(stored.body),
            };
            items.push(item);
        }
        Ok(ExportBundle::new(self.now(), items))
    }

    /// Imports an export bundle.
    ///
    /// A bad container rejects everything. Otherwise every valid item is
    /// stored (overwriting records with the same id) and, if any item was
    /// rejected, `PartialImport` reports how many landed and which failed.
    pub fn import_all(&self, bundle: &Value) -> Result<usize> {
        let items = parse_container(bundle)?;
        let (valid, rejected) = validate_items(items);

        let mut store = self.lock();
        let mut imported = 0;
        for record in valid {
            let key = record.resource_key();
            let merged = self.authority.observe(&key, &record.clock);
            store.put_clock(&key, &merged)?;
            store.put(&record)?;
            self.last_created_ms
                .fetch_max(record.created_at.timestamp_millis().max(0) as u64, Ordering::SeqCst);
            imported += 1;
        }

        if rejected.is_empty() {
            info!(imported, "import complete");
            Ok(imported)
        } else {
            warn!(imported, rejected = rejected.len(), "import partially rejected");
            Err(Error::PartialImport { imported, rejected })
        }
    }
}

fn millis_to_datetime(ms: u64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms as i64).single().unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn check_transition(record: &Record, to: Status) -> Result<()> {
    if record.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition { id: record.id.clone(), from: record.status, to })
    }
}

fn read<S: QueueStore + ?Sized>(store: &S, id: &str) -> Result<Record> {
    let stored = store.get(id)?.ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
    validate_body(&stored.body).map_err(|e| match e {
        Error::Validation { reason, .. } => Error::Validation { id: Some(id.to_string()), reason },
        other => other,
    })
}

/// Maps each resource key to the id of its oldest unfinished record.
fn resource_heads(records: &[Record]) -> HashMap<String, String> {
    let mut heads: HashMap<String, &Record> = HashMap::new();
    for record in records.iter().filter(|r| r.is_unfinished()) {
        heads
            .entry(record.resource_key())
            .and_modify(|head| {
                if (&record.created_at, &record.id) < (&head.created_at, &head.id) {
                    *head = record;
                }
            })
            .or_insert(record);
    }
    heads.into_iter().map(|(key, head)| (key, head.id.clone())).collect()
}

/// Splits the store into valid records and quarantined ones.
fn load<S: QueueStore + ?Sized>(store: &S) -> Result<(Vec<Record>, Vec<Corrupted>)> {
    let mut records = Vec::new();
    let mut corrupted = Vec::new();
    for stored in store.get_all()? {
        match validate_body(&stored.body) {
            Ok(record) if record.id == stored.id => records.push(record),
            Ok(record) => corrupted.push(Corrupted {
                reason: format!("body id '{}' does not match key", record.id),
                id: stored.id,
                body: stored.body,
            }),
            Err(e) => {
                let reason = match e {
                    Error::Validation { reason, .. } => reason,
                    other => other.to_string(),
                };
                corrupted.push(Corrupted { id: stored.id, reason, body: stored.body });
            }
        }
    }
    Ok((records, corrupted))
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
