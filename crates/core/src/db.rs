// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable queue store.
//!
//! Each record lives in one row keyed by its id. The full record is kept as
//! JSON text in `body`; `status`, `priority` and `created_at` are copied out
//! of it on write so the common lookups can use an index. Rows whose body no
//! longer decodes are still returned by [`QueueStore::get_all`].

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::clock::VectorClock;
use crate::error::Result;
use crate::record::Record;
use crate::store::{QueueStore, StoredRecord};

/// SQL schema for the queue database.
pub const SCHEMA: &str = r#"
-- Queued mutations; body is the authoritative JSON record
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    status TEXT,
    priority INTEGER,
    created_at TEXT,
    body TEXT NOT NULL
);

-- Latest vector clock per resource ("type/id")
CREATE TABLE IF NOT EXISTS clocks (
    resource TEXT PRIMARY KEY,
    clock TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_status ON records(status);
CREATE INDEX IF NOT EXISTS idx_records_priority ON records(priority);
CREATE INDEX IF NOT EXISTS idx_records_created ON records(created_at);
"#;

/// Run all migrations on a connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Queue store on a single SQLite database file.
pub struct SqliteStore {
    /// The underlying SQLite connection.
    pub conn: Connection,
}

impl SqliteStore {
    /// Open the store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL keeps the previous committed state intact if a write dies midway
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        let store = SqliteStore { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        run_migrations(&store.conn)?;
        Ok(store)
    }

    /// Caps the database file at `pages` pages.
    ///
    /// SQLite never shrinks the cap below the current size. Writes that would
    /// grow past it fail with `StorageExhausted`. Returns the effective cap.
    pub fn set_page_limit(&self, pages: u64) -> Result<u64> {
        let effective: i64 =
            self.conn
                .pragma_update_and_check(None, "max_page_count", pages as i64, |row| row.get(0))?;
        Ok(effective.max(0) as u64)
    }

    /// Current size of the database in pages.
    pub fn page_count(&self) -> Result<u64> {
        let pages: i64 = self.conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        Ok(pages.max(0) as u64)
    }

    /// Stores a raw body without checking it.
    pub fn put_raw(&self, id: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (id, status, priority, created_at, body)
             VALUES (?1, NULL, NULL, NULL, ?2)
             ON CONFLICT(id) DO UPDATE SET
                status = NULL, priority = NULL, created_at = NULL, body = excluded.body",
            params![id, body],
        )?;
        Ok(())
    }

    /// Ids of records in a given status, read from the indexed column.
    #[cfg(test)]
    pub(crate) fn ids_with_status(&self, status: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM records WHERE status = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![status], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

impl QueueStore for SqliteStore {
    fn put(&mut self, record: &Record) -> Result<()> {
        let stored = StoredRecord::from_record(record)?;
        self.conn.execute(
            "INSERT INTO records (id, status, priority, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                priority = excluded.priority,
                created_at = excluded.created_at,
                body = excluded.body",
            params![
                stored.id,
                record.status.as_str(),
                record.priority,
                record.created_at.to_rfc3339(),
                stored.body,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredRecord>> {
        let body: Option<String> = self
            .conn
            .query_row("SELECT body FROM records WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(body.map(|body| StoredRecord { id: id.to_string(), body }))
    }

    fn get_all(&self) -> Result<Vec<StoredRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM records ORDER BY priority, created_at, id")?;
        let rows = stmt
            .query_map([], |row| Ok(StoredRecord { id: row.get(0)?, body: row.get(1)? }))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM records WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM records", [])?;
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn put_clock(&mut self, resource_key: &str, clock: &VectorClock) -> Result<()> {
        self.conn.execute(
            "INSERT INTO clocks (resource, clock) VALUES (?1, ?2)
             ON CONFLICT(resource) DO UPDATE SET clock = excluded.clock",
            params![resource_key, serde_json::to_string(clock)?],
        )?;
        Ok(())
    }

    fn clocks(&self) -> Result<Vec<(String, VectorClock)>> {
        let mut stmt = self.conn.prepare("SELECT resource, clock FROM clocks ORDER BY resource")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut clocks = Vec::with_capacity(rows.len());
        for (resource, text) in rows {
            match serde_json::from_str(&text) {
                Ok(clock) => clocks.push((resource, clock)),
                Err(e) => tracing::warn!(resource, error = %e, "skipping unreadable clock"),
            }
        }
        Ok(clocks)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
