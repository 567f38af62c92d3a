// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix shared by every record id.
pub const ID_PREFIX: &str = "op";

/// Generate a record ID from the device, the resource it targets, and its enqueue time.
/// Format: op-{hash} where hash is first 16 hex chars of SHA256(device + resource + timestamp + seq)
pub fn generate_id(device_id: &str, resource_key: &str, created_at: &DateTime<Utc>, seq: u64) -> String {
    let input = format!("{}|{}|{}|{}", device_id, resource_key, created_at.to_rfc3339(), seq);
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..8]); // First 16 hex chars (8 bytes)
    format!("{}-{}", ID_PREFIX, short_hash)
}

/// Generate a unique ID, handling collisions by appending incrementing suffix.
pub fn generate_unique_id<F>(
    device_id: &str,
    resource_key: &str,
    created_at: &DateTime<Utc>,
    seq: u64,
    exists: F,
) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(device_id, resource_key, created_at, seq);

    if !exists(&base_id) {
        return base_id;
    }

    // Handle collision with incrementing suffix
    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
