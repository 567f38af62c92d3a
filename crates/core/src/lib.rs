// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ebb-core: Shared library for the ebb offline queue
//!
//! This crate provides the data structures, vector clocks, durable store,
//! and wire protocol used by both the ebb engine and the ebb-remote server.

pub mod clock;
pub mod db;
pub mod error;
pub mod export;
pub mod id;
pub mod jsonl;
pub mod protocol;
pub mod record;
pub mod store;

pub use clock::{resource_key, Causality, ClockAuthority, ClockSource, SystemClock, VectorClock};
pub use db::SqliteStore;
pub use error::{Error, RejectedItem, Result};
pub use export::{ExportBundle, EXPORT_VERSION};
pub use protocol::{ClientMessage, Rejection, RejectionKind, ReplayAck, ReplayRequest, ServerMessage, Snapshot};
pub use record::{Action, Record, Status};
pub use store::{MemoryStore, QueueStore, StoredRecord};
