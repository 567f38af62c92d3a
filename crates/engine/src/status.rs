// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only sync status projection.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::network::Quality;

/// Snapshot of the engine's sync state for hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub is_online: bool,
    pub sync_in_progress: bool,
    /// Records waiting for replay, scheduled retries included.
    pub pending_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub connection_quality: Quality,
}

impl SyncStatus {
    /// Renders the status as aligned `key: value` lines.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("online:       {}", if self.is_online { "yes" } else { "no" }),
            format!("quality:      {}", self.connection_quality),
            format!("syncing:      {}", if self.sync_in_progress { "yes" } else { "no" }),
            format!("pending:      {}", self.pending_count),
            format!("failed:       {}", self.failed_count),
        ];
        match self.last_sync {
            Some(at) => lines.push(format!("last sync:    {}", at.to_rfc3339())),
            None => lines.push("last sync:    never".to_string()),
        }
        if let Some(error) = &self.error {
            lines.push(format!("error:        {error}"));
        }
        lines.join("\n")
    }
}
