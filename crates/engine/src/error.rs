// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the ebb engine.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ebb_core::Error),

    #[error("not initialized: {0}\n  hint: run 'ebb init' first")]
    NotInitialized(String),

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("data directory {0} is in use by another ebb process")]
    Locked(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("no remote configured\n  hint: set [remote] url in config.toml or pass --remote")]
    NoRemote,

    #[error("transport error: {0}")]
    Transport(#[from] crate::sync::TransportError),

    #[error("remote rejected credentials: {0}\n  hint: fix the token, then run 'ebb sync' to resume")]
    Unauthorized(String),

    #[error("conflict not found: {0}")]
    ConflictNotFound(String),

    #[error("invalid payload: {0}\n  hint: pass a JSON value, e.g. '{{\"title\":\"A\"}}'")]
    InvalidPayload(String),

    #[error("invalid choice: '{0}'\n  hint: valid choices are: local, remote")]
    InvalidChoice(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the store refused a write for lack of space.
    pub fn is_storage_exhausted(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_storage_exhausted())
    }
}

/// A specialized Result type for ebb engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
