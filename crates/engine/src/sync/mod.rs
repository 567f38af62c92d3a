// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replay of queued records against the remote service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Queue     │────►│ Coordinator  │────►│   Remote    │────►│  Transport  │
//! │  Manager    │◄────│ (cycles)     │◄────│ (trait)     │◄────│  (trait)    │
//! └─────────────┘     └──────────────┘     └─────────────┘     └─────────────┘
//!                        │        ▲
//!                        ▼        │
//!                  ┌──────────┐ ┌─────────┐
//!                  │ Conflict │ │ Network │
//!                  │ Resolver │ │ Monitor │
//!                  └──────────┘ └─────────┘
//! ```
//!
//! # Features
//!
//! - One cycle at a time, each record attempted at most once per cycle
//! - Exponential backoff with a cap, bounded by `max_retries`
//! - Rate limiting between consecutive remote calls
//! - Circuit breaker over consecutive failed cycles
//! - Batch size adapted to link quality
//! - Injectable remote and transport traits for testing

use std::time::Duration;

mod backoff;
mod client;
mod coordinator;
mod transport;

pub use backoff::{BackoffPolicy, CircuitBreaker, RateLimiter};
pub use client::{ClientConfig, PingProbe, Remote, ReplayClient};
pub use coordinator::{Coordinator, CycleEvent, CycleReport, FailureKind, SkipReason, SyncState};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};

/// Tunables for the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Run cycles on a timer.
    pub auto_process: bool,
    pub process_interval: Duration,
    pub exponential_backoff: bool,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Minimum spacing between remote calls within a cycle.
    pub rate_limit_delay: Duration,
    /// Records per batch on a good link.
    pub batch_size: usize,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            auto_process: true,
            process_interval: Duration::from_secs(30),
            exponential_backoff: true,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(300),
            rate_limit_delay: Duration::from_millis(100),
            batch_size: 10,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(60),
        }
    }
}

impl SyncOptions {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            exponential: self.exponential_backoff,
            base: self.retry_base_delay,
            cap: self.retry_max_delay,
        }
    }
}
