// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ebb-core operations.

use thiserror::Error;

use crate::record::Status;

/// An import item that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    /// Position of the item in the imported `items` array.
    pub index: usize,
    /// The item's `id`, when it had a readable one.
    pub id: Option<String>,
    /// Why the item was rejected.
    pub reason: String,
}

impl std::fmt::Display for RejectedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{} ({}): {}", self.index, id, self.reason),
            None => write!(f, "#{}: {}", self.index, self.reason),
        }
    }
}

fn join_rejected(rejected: &[RejectedItem]) -> String {
    rejected.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// All possible errors that can occur in ebb-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("queue is full ({max} records)\n  hint: wait for the queue to drain or raise max_queue_size")]
    QueueFull { max: usize },

    #[error("storage exhausted: {0}\n  hint: free disk space or run 'ebb compact'")]
    StorageExhausted(String),

    #[error("invalid record{}: {reason}", id.as_deref().map(|i| format!(" '{i}'")).unwrap_or_default())]
    Validation { id: Option<String>, reason: String },

    #[error("invalid status transition for {id}: cannot go from {from} to {to}")]
    InvalidTransition { id: String, from: Status, to: Status },

    #[error("retry limit reached for {id} ({retries} retries)\n  hint: run 'ebb retry {id}' to start over")]
    RetryLimit { id: String, retries: u32 },

    #[error("invalid export bundle: {0}")]
    InvalidBundle(String),

    #[error("partial import: {imported} imported, {} rejected: {}", rejected.len(), join_rejected(rejected))]
    PartialImport { imported: usize, rejected: Vec<RejectedItem> },

    #[error("invalid action: '{0}'\n  hint: valid actions are: create, update, delete")]
    InvalidAction(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: pending, processing, completed, failed, retrying")]
    InvalidStatus(String),

    #[error("invalid vector clock: {0}")]
    InvalidClock(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DiskFull) => Error::StorageExhausted(e.to_string()),
            _ => Error::Database(e),
        }
    }
}

impl Error {
    /// Returns true if the backing medium refused a write for lack of space.
    pub fn is_storage_exhausted(&self) -> bool {
        matches!(self, Error::StorageExhausted(_))
    }
}

/// A specialized Result type for ebb-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
