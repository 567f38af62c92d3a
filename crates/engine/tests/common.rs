// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// The `ebb` binary with a clean environment for data dir and logging.
pub fn ebb() -> Command {
    let mut cmd = cargo_bin_cmd!("ebb");
    cmd.env_remove("EBB_DIR")
        .env_remove("EBB_LOG")
        .env_remove("EBB_DEVICE_ID")
        .env("NO_COLOR", "1");
    cmd
}

/// The `ebb` binary pointed at `temp`.
pub fn ebb_in(temp: &TempDir) -> Command {
    let mut cmd = ebb();
    cmd.arg("--dir").arg(temp.path());
    cmd
}

/// Helper to create an initialized temp data directory
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    ebb_in(&temp)
        .args(["init", "--device-id", "dev1"])
        .assert()
        .success();
    temp
}

/// Helper to enqueue a mutation and return its record id
pub fn enqueue(temp: &TempDir, resource_id: &str, action: &str, payload: &str) -> String {
    let output = ebb_in(temp)
        .args(["enqueue", "todo", resource_id, action, payload])
        .output()
        .unwrap();
    assert!(output.status.success(), "enqueue failed: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
