// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One engine per data directory.
//!
//! [`Engine::open`] wires the durable store, queue manager, conflict
//! resolver and network monitor together and holds an exclusive lock on
//! the data directory for its lifetime. Parked conflicts survive restarts
//! through a JSONL journal beside the database.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use ebb_core::{jsonl, Record, SqliteStore, Status, SystemClock};

use crate::config::{db_path, journal_path, lock_path, Config};
use crate::conflict::{Choice, Conflict, ConflictResolver};
use crate::error::{Error, Result};
use crate::network::{NetworkMonitor, TcpProbe};
use crate::queue::QueueManager;
use crate::status::SyncStatus;
use crate::sync::{Coordinator, PingProbe, Remote, ReplayClient};

/// Queue manager over the on-disk store.
pub type DiskQueue = QueueManager<SqliteStore>;

/// The wired components of one client.
pub struct Engine {
    data_dir: PathBuf,
    config: Config,
    queue: Arc<DiskQueue>,
    resolver: Arc<ConflictResolver>,
    monitor: Arc<NetworkMonitor>,
    _lock: File,
}

impl Engine {
    /// Opens the engine for an initialized data directory.
    ///
    /// Fails with `Locked` if another engine holds the directory. Records
    /// left `processing` by a crash go back to `pending`, except the ones
    /// waiting on a parked conflict.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let lock = acquire_lock(data_dir)?;

        let store = SqliteStore::open(&db_path(data_dir))?;
        let queue = Arc::new(QueueManager::open(
            store,
            &config.device_id,
            Arc::new(SystemClock),
            config.queue_options(),
        )?);

        let resolver = Arc::new(ConflictResolver::new(config.auto_resolve_conflicts));
        let conflicts: Vec<Conflict> = jsonl::read_all(&journal_path(data_dir))?;
        let restored = resolver.restore(conflicts);
        if restored > 0 {
            debug!(restored, "restored parked conflicts");
        }
        queue.recover_interrupted(|id| resolver.is_parked(id))?;

        info!(dir = %data_dir.display(), device = %config.device_id, "engine opened");
        Ok(Engine {
            data_dir: data_dir.to_path_buf(),
            config,
            queue,
            resolver,
            monitor: Arc::new(NetworkMonitor::new(true)),
            _lock: lock,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn queue(&self) -> &Arc<DiskQueue> {
        &self.queue
    }

    pub fn resolver(&self) -> &Arc<ConflictResolver> {
        &self.resolver
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    /// Builds a coordinator replaying this engine's queue against `remote`.
    pub fn coordinator<R: Remote>(&self, remote: R) -> Coordinator<SqliteStore, R> {
        Coordinator::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.resolver),
            Arc::clone(&self.monitor),
            remote,
            self.config.sync_options(),
        )
    }

    /// WebSocket client for the configured remote.
    pub fn websocket_remote(&self) -> Result<ReplayClient> {
        let remote = self.config.remote.as_ref().ok_or(Error::NoRemote)?;
        Ok(ReplayClient::new(remote))
    }

    /// TCP reachability probe for the configured remote.
    pub fn probe(&self) -> Option<TcpProbe> {
        let remote = self.config.remote.as_ref()?;
        TcpProbe::for_url(&remote.url, Duration::from_millis(remote.connect_timeout_ms))
    }

    /// Protocol-level probe for long-running loops; keeps its own connection.
    pub fn ping_probe(&self) -> Option<PingProbe> {
        self.config.remote.as_ref().map(PingProbe::new)
    }

    /// Status projection without a running coordinator.
    ///
    /// `last_sync` is the latest completion time among stored records.
    pub fn status(&self) -> Result<SyncStatus> {
        let counts = self.queue.counts()?;
        let last_sync = self
            .queue
            .list()?
            .iter()
            .filter(|r| r.status == Status::Completed)
            .filter_map(|r| r.completed_at)
            .max();
        let error = match &self.config.remote {
            None => Some(Error::NoRemote.to_string()),
            Some(_) => None,
        };
        Ok(SyncStatus {
            is_online: self.monitor.is_online(),
            sync_in_progress: false,
            pending_count: counts.pending + counts.retrying,
            failed_count: counts.failed,
            last_sync,
            error,
            connection_quality: self.monitor.quality(),
        })
    }

    /// Resolves a parked conflict and updates the journal.
    pub fn resolve(&self, operation_id: &str, choice: Choice) -> Result<Record> {
        let record = self.resolver.resolve_manually(&self.queue, operation_id, choice)?;
        self.persist_conflicts()?;
        Ok(record)
    }

    /// Rewrites the conflict journal from the resolver's parked set.
    pub fn persist_conflicts(&self) -> Result<()> {
        save_journal(&self.data_dir, &self.resolver)
    }
}

/// Writes the parked conflicts of `resolver` to the journal in `data_dir`.
pub fn save_journal(data_dir: &Path, resolver: &ConflictResolver) -> Result<()> {
    let pending = resolver.pending();
    jsonl::write_all(&journal_path(data_dir), &pending)?;
    debug!(parked = pending.len(), "conflict journal written");
    Ok(())
}

fn acquire_lock(data_dir: &Path) -> Result<File> {
    use fs2::FileExt;

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path(data_dir))?;
    file.try_lock_exclusive()
        .map_err(|_| Error::Locked(data_dir.display().to_string()))?;
    Ok(file)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
