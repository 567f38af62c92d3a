// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay protocol between the engine and the remote service.
//!
//! The protocol is request/response over a WebSocket:
//! - Client sends one `replay` per queued record, tagged with a sequence number
//! - Server answers each with `replayed` or `rejected` carrying the same `seq`
//!
//! The server deduplicates by `record_id`, so replaying a record whose
//! outcome was lost in transit has no second effect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::VectorClock;
use crate::record::{Action, Record};

/// One queued mutation as sent to the remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayRequest {
    pub record_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub action: Action,
    pub payload: Value,
    #[serde(default)]
    pub clock: VectorClock,
}

impl ReplayRequest {
    /// Builds the request for a record.
    pub fn from_record(record: &Record) -> Self {
        ReplayRequest {
            record_id: record.id.clone(),
            resource_type: record.resource_type.clone(),
            resource_id: record.resource_id.clone(),
            action: record.action,
            payload: record.payload.clone(),
            clock: record.clock.clone(),
        }
    }

    /// Size of the payload when encoded, in bytes.
    pub fn payload_len(&self) -> usize {
        serde_json::to_vec(&self.payload).map(|v| v.len()).unwrap_or(0)
    }
}

/// Successful replay acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplayAck {
    /// Identifier the remote assigned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// The resource clock after the replay was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<VectorClock>,
}

/// Why the remote refused a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Network,
    Server,
    Conflict,
    PayloadTooLarge,
    Unauthorized,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::Network => "network",
            RejectionKind::Server => "server",
            RejectionKind::Conflict => "conflict",
            RejectionKind::PayloadTooLarge => "payload_too_large",
            RejectionKind::Unauthorized => "unauthorized",
        }
    }
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The remote's current version of a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub payload: Value,
    #[serde(default)]
    pub clock: VectorClock,
}

/// A typed replay refusal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
    /// Present on conflicts: what the remote holds now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<Snapshot>,
}

impl Rejection {
    /// Creates a rejection without a snapshot.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Rejection { kind, message: message.into(), remote: None }
    }

    /// Creates a conflict rejection carrying the remote snapshot.
    pub fn conflict(message: impl Into<String>, remote: Snapshot) -> Self {
        Rejection { kind: RejectionKind::Conflict, message: message.into(), remote: Some(remote) }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replay a queued record.
    Replay {
        /// Client-chosen sequence number echoed in the answer.
        seq: u64,
        /// Bearer token, when the remote requires one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        request: ReplayRequest,
    },

    /// Ping message for keepalive and latency sampling.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The replay with this `seq` was applied (or had already been).
    Replayed { seq: u64, ack: ReplayAck },

    /// The replay with this `seq` was refused.
    Rejected { seq: u64, rejection: Rejection },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error message for frames the server could not understand.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a Replay message.
    pub fn replay(seq: u64, token: Option<String>, request: ReplayRequest) -> Self {
        ClientMessage::Replay { seq, token, request }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a Replayed message.
    pub fn replayed(seq: u64, ack: ReplayAck) -> Self {
        ServerMessage::Replayed { seq, ack }
    }

    /// Creates a Rejected message.
    pub fn rejected(seq: u64, rejection: Rejection) -> Self {
        ServerMessage::Rejected { seq, rejection }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }

    /// Sequence number this message answers, if any.
    pub fn seq(&self) -> Option<u64> {
        match self {
            ServerMessage::Replayed { seq, .. } | ServerMessage::Rejected { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
