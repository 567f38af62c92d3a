// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ebb_core::{ClockSource, MemoryStore, ReplayAck, ReplayRequest, Rejection};

use crate::queue::{QueueManager, QueueOptions};
use crate::sync::Remote;

/// Start time for mock clocks: 2023-11-14T22:13:20Z.
pub const T0: u64 = 1_700_000_000_000;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct MockClock {
    now: AtomicU64,
}

impl MockClock {
    pub fn new(now_ms: u64) -> Self {
        MockClock { now: AtomicU64::new(now_ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// An in-memory queue for device `dev1` with default options.
pub fn memory_queue() -> (QueueManager<MemoryStore>, Arc<MockClock>) {
    memory_queue_with(MemoryStore::new(), QueueOptions::default())
}

/// An in-memory queue for device `dev1` over the given store.
pub fn memory_queue_with(
    store: MemoryStore,
    options: QueueOptions,
) -> (QueueManager<MemoryStore>, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(T0));
    let queue = QueueManager::open(store, "dev1", clock.clone(), options).unwrap();
    (queue, clock)
}

type Outcome = Result<ReplayAck, Rejection>;

/// A scripted remote.
///
/// Answers replays from a queue of outcomes; once the script runs dry every
/// replay succeeds, echoing the request clock. Clones share state so a test
/// can keep a handle after moving the remote into a coordinator.
#[derive(Clone, Default)]
pub struct MockRemote {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    requests: Arc<Mutex<Vec<ReplayRequest>>>,
    latency: Arc<Mutex<Duration>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next unanswered replay.
    pub fn push(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Queues `n` copies of an outcome.
    pub fn push_n(&self, n: usize, outcome: Outcome) {
        for _ in 0..n {
            self.push(outcome.clone());
        }
    }

    /// Every replay sleeps this long before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ReplayRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Record ids received so far, in order.
    pub fn replayed_ids(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.record_id).collect()
    }
}

impl Remote for MockRemote {
    fn replay(
        &mut self,
        request: ReplayRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ReplayAck, Rejection>> + Send + '_>> {
        Box::pin(async move {
            let latency = *self.latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let scripted = self.script.lock().unwrap().pop_front();
            let outcome = scripted.unwrap_or_else(|| {
                Ok(ReplayAck { server_id: None, clock: Some(request.clock.clone()) })
            });
            self.requests.lock().unwrap().push(request);
            outcome
        })
    }
}
