// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue store contract and an in-memory implementation.
//!
//! A store keeps record bodies as raw JSON text and never interprets them:
//! a body that no longer decodes is still returned so the queue manager can
//! quarantine it instead of losing it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::VectorClock;
use crate::error::{Error, Result};
use crate::record::Record;

/// A record as it sits in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    /// JSON text of the record.
    pub body: String,
}

impl StoredRecord {
    /// Serializes a record for storage.
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(StoredRecord { id: record.id.clone(), body: serde_json::to_string(record)? })
    }
}

/// Crash-resistant storage for queue records and resource clocks.
///
/// `put` on an existing id overwrites in place. A write the medium refuses
/// for lack of space fails with [`Error::StorageExhausted`] and leaves the
/// previous version of the record untouched.
pub trait QueueStore: Send {
    /// Inserts or overwrites a record.
    fn put(&mut self, record: &Record) -> Result<()>;

    /// Returns the stored body for an id.
    fn get(&self, id: &str) -> Result<Option<StoredRecord>>;

    /// Returns every stored body.
    fn get_all(&self) -> Result<Vec<StoredRecord>>;

    /// Removes a record. Returns false if it was not present.
    fn delete(&mut self, id: &str) -> Result<bool>;

    /// Removes every record. Clocks are kept.
    fn clear(&mut self) -> Result<()>;

    /// Number of stored records, corrupt ones included.
    fn len(&self) -> Result<usize>;

    /// Returns true if no record is stored.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Persists the latest clock of a resource.
    fn put_clock(&mut self, resource_key: &str, clock: &VectorClock) -> Result<()>;

    /// Returns all persisted resource clocks.
    fn clocks(&self) -> Result<Vec<(String, VectorClock)>>;
}

/// Volatile store for tests and ephemeral hosts.
///
/// An optional record limit stands in for a storage quota, and a shared
/// switch can make every write fail as if the medium were full.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, String>,
    clocks: HashMap<String, VectorClock>,
    max_records: Option<usize>,
    exhausted: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an unbounded store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Creates a store that refuses new records beyond `max_records`.
    pub fn with_quota(max_records: usize) -> Self {
        MemoryStore { max_records: Some(max_records), ..MemoryStore::default() }
    }

    /// Returns a switch that, while set, makes every write fail.
    pub fn quota_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exhausted)
    }

    /// Stores a raw body without checking it.
    pub fn put_raw(&mut self, id: impl Into<String>, body: impl Into<String>) {
        self.records.insert(id.into(), body.into());
    }

    fn check_quota(&self, id: &str) -> Result<()> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(Error::StorageExhausted("memory quota switch is set".into()));
        }
        if let Some(max) = self.max_records {
            if !self.records.contains_key(id) && self.records.len() >= max {
                return Err(Error::StorageExhausted(format!("memory quota of {max} records")));
            }
        }
        Ok(())
    }
}

impl QueueStore for MemoryStore {
    fn put(&mut self, record: &Record) -> Result<()> {
        self.check_quota(&record.id)?;
        let stored = StoredRecord::from_record(record)?;
        self.records.insert(stored.id, stored.body);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredRecord>> {
        Ok(self
            .records
            .get(id)
            .map(|body| StoredRecord { id: id.to_string(), body: body.clone() }))
    }

    fn get_all(&self) -> Result<Vec<StoredRecord>> {
        Ok(self
            .records
            .iter()
            .map(|(id, body)| StoredRecord { id: id.clone(), body: body.clone() })
            .collect())
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.records.remove(id).is_some())
    }

    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn put_clock(&mut self, resource_key: &str, clock: &VectorClock) -> Result<()> {
        if self.exhausted.load(Ordering::SeqCst) {
            return Err(Error::StorageExhausted("memory quota switch is set".into()));
        }
        self.clocks.insert(resource_key.to_string(), clock.clone());
        Ok(())
    }

    fn clocks(&self) -> Result<Vec<(String, VectorClock)>> {
        Ok(self.clocks.iter().map(|(k, c)| (k.clone(), c.clone())).collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
