// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `EBB_DIR` if set and non-empty.
pub fn data_dir() -> Option<PathBuf> {
    non_empty(vars::EBB_DIR).map(PathBuf::from)
}

/// Returns the value of `EBB_LOG` if set and non-empty.
pub fn log_filter() -> Option<String> {
    non_empty(vars::EBB_LOG)
}

/// Returns the value of `EBB_DEVICE_ID` if set and non-empty.
pub fn device_id() -> Option<String> {
    non_empty(vars::EBB_DEVICE_ID)
}

/// Returns the value of `XDG_DATA_HOME` if set and non-empty.
pub fn xdg_data_home() -> Option<PathBuf> {
    non_empty(vars::XDG_DATA_HOME).map(PathBuf::from)
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
