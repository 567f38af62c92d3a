// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ebb-remote: reference replay server for the ebb offline queue.
//!
//! Keeps the latest payload and vector clock of every resource, applies
//! replays that causally follow what it holds, and answers `conflict` with
//! its own snapshot otherwise. Applied replays can be journaled to a data
//! directory so the state survives restarts.

pub mod server;
pub mod state;

#[cfg(test)]
mod server_tests;

pub use server::{run, serve};
pub use state::{ServerOptions, ServerState};
