// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync coordinator: drives replay cycles.
//!
//! States: `Idle → Syncing → {Idle | Paused | CircuitOpen}`. `Paused` is
//! left only through [`Coordinator::resume`]; `CircuitOpen` closes on its own
//! once the cool-down has elapsed.
//!
//! A cycle drains the ready records in queue order, one remote call at a
//! time, and gives every record at most one attempt. What happens to a record
//! depends on the outcome:
//!
//! | outcome            | record                                        |
//! |--------------------|-----------------------------------------------|
//! | success            | completed, remote clock observed              |
//! | network / server   | retry after backoff, or failed at the limit   |
//! | conflict           | handed to the conflict resolver               |
//! | payload too large  | failed, never retried                         |
//! | unauthorized       | failed; the coordinator pauses                |

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ebb_core::{QueueStore, Record, Rejection, RejectionKind, ReplayRequest};

use super::backoff::{BackoffPolicy, CircuitBreaker, RateLimiter};
use super::client::Remote;
use super::SyncOptions;
use crate::conflict::{ConflictResolver, Resolution};
use crate::error::{Error, Result};
use crate::events::{Subscribers, SubscriptionId};
use crate::network::{NetworkMonitor, Quality, Sample};
use crate::queue::QueueManager;
use crate::status::SyncStatus;

/// Shortest sleep of the run loop when a retry is already due.
const MIN_WAKE: Duration = Duration::from_millis(50);

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    /// Stopped after an authentication failure.
    Paused,
    /// Refusing cycles until `until_ms` (epoch milliseconds).
    CircuitOpen { until_ms: u64 },
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Paused => "paused",
            SyncState::CircuitOpen { .. } => "circuit_open",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Network,
    Server,
    Auth,
    Conflict,
    Storage,
    Validation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Server => "server",
            FailureKind::Auth => "auth",
            FailureKind::Conflict => "conflict",
            FailureKind::Storage => "storage",
            FailureKind::Validation => "validation",
        }
    }

    /// Returns true for failures worth retrying with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::Server)
    }
}

impl From<RejectionKind> for FailureKind {
    fn from(kind: RejectionKind) -> Self {
        match kind {
            RejectionKind::Network => FailureKind::Network,
            RejectionKind::Server => FailureKind::Server,
            RejectionKind::Conflict => FailureKind::Conflict,
            RejectionKind::PayloadTooLarge => FailureKind::Validation,
            RejectionKind::Unauthorized => FailureKind::Auth,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a cycle did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySyncing,
    Paused,
    CircuitOpen,
    Offline,
    Shutdown,
}

/// Tally of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub attempted: usize,
    pub completed: usize,
    pub retrying: usize,
    pub failed: usize,
    pub conflicts: usize,
    pub superseded: usize,
    /// Network and server failures, the ones the circuit breaker counts.
    pub transient_failures: usize,
    /// Stopped early by `cancel` or `shutdown`.
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    /// Last failure message seen in the cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    fn skipped(reason: SkipReason) -> Self {
        CycleReport { skipped: Some(reason), ..CycleReport::default() }
    }

    /// A failed cycle has transient failures and nothing completed.
    pub fn is_failed_cycle(&self) -> bool {
        self.completed == 0 && self.transient_failures > 0
    }
}

/// Delivered to `on_cycle_event` subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    CycleStarted { batch_size: usize },
    ItemCompleted { id: String, processing_time_ms: u64 },
    ItemRetrying { id: String, kind: FailureKind, retry_count: u32, delay: Duration },
    ItemFailed { id: String, kind: FailureKind, error: String },
    ConflictDetected { id: String, resolution: Resolution },
    ItemSuperseded { id: String },
    CycleFinished(CycleReport),
    StateChanged(SyncState),
}

/// Records per batch for a link quality.
pub fn adaptive_batch_size(full: usize, quality: Quality) -> usize {
    let size = match quality {
        Quality::Good => full,
        Quality::Fair => full / 2,
        Quality::Slow | Quality::Offline => full / 4,
    };
    size.max(1)
}

struct Control {
    state: SyncState,
    breaker: CircuitBreaker,
    last_sync: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

struct Link<R> {
    remote: R,
    limiter: RateLimiter,
}

enum Flow {
    Continue,
    Stop,
}

/// Clears the in-progress flag when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives replay of the queue against a remote.
pub struct Coordinator<S: QueueStore, R: Remote> {
    queue: Arc<QueueManager<S>>,
    resolver: Arc<ConflictResolver>,
    monitor: Arc<NetworkMonitor>,
    link: tokio::sync::Mutex<Link<R>>,
    options: SyncOptions,
    backoff: BackoffPolicy,
    control: Mutex<Control>,
    syncing: AtomicBool,
    cancelled: AtomicBool,
    shutdown: CancellationToken,
    wake: Arc<Notify>,
    events: Subscribers<CycleEvent>,
}

impl<S: QueueStore, R: Remote> Coordinator<S, R> {
    pub fn new(
        queue: Arc<QueueManager<S>>,
        resolver: Arc<ConflictResolver>,
        monitor: Arc<NetworkMonitor>,
        remote: R,
        options: SyncOptions,
    ) -> Self {
        let breaker = CircuitBreaker::new(options.circuit_breaker_threshold, options.circuit_breaker_cooldown);
        Coordinator {
            queue,
            resolver,
            monitor,
            link: tokio::sync::Mutex::new(Link { remote, limiter: RateLimiter::new(options.rate_limit_delay) }),
            backoff: options.backoff(),
            options,
            control: Mutex::new(Control { state: SyncState::Idle, breaker, last_sync: None, last_error: None }),
            syncing: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            wake: Arc::new(Notify::new()),
            events: Subscribers::new(),
        }
    }

    pub fn queue(&self) -> &Arc<QueueManager<S>> {
        &self.queue
    }

    pub fn resolver(&self) -> &Arc<ConflictResolver> {
        &self.resolver
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn state(&self) -> SyncState {
        self.control().state
    }

    pub fn on_cycle_event(&self, handler: impl Fn(&CycleEvent) + Send + Sync + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now_ms(&self) -> u64 {
        self.queue.now().timestamp_millis().max(0) as u64
    }

    fn set_state(&self, state: SyncState) {
        let changed = {
            let mut control = self.control();
            let changed = control.state != state;
            control.state = state;
            changed
        };
        if changed {
            info!(%state, "sync state changed");
            self.events.emit(&CycleEvent::StateChanged(state));
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.shutdown.is_cancelled()
    }

    /// Runs one cycle if the coordinator is idle, online, and not held back
    /// by the circuit breaker.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.cycle(false).await
    }

    /// Runs one cycle now, even if the monitor reports offline.
    ///
    /// A paused coordinator or an open circuit still refuses.
    pub async fn force_sync(&self) -> Result<CycleReport> {
        self.cycle(true).await
    }

    async fn cycle(&self, forced: bool) -> Result<CycleReport> {
        if self.shutdown.is_cancelled() {
            return Ok(CycleReport::skipped(SkipReason::Shutdown));
        }
        if self.syncing.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            debug!("cycle already running");
            return Ok(CycleReport::skipped(SkipReason::AlreadySyncing));
        }
        let _guard = CycleGuard(&self.syncing);

        let now_ms = self.now_ms();
        let (state, allowed) = {
            let mut control = self.control();
            let allowed = control.breaker.allow(now_ms);
            (control.state, allowed)
        };
        if state == SyncState::Paused {
            return Ok(CycleReport::skipped(SkipReason::Paused));
        }
        if !allowed {
            debug!("circuit open, cycle refused");
            return Ok(CycleReport::skipped(SkipReason::CircuitOpen));
        }
        if matches!(state, SyncState::CircuitOpen { .. }) {
            info!("circuit closed after cool-down");
            self.set_state(SyncState::Idle);
        }
        if !forced && !self.monitor.is_online() {
            debug!("offline, cycle skipped");
            return Ok(CycleReport::skipped(SkipReason::Offline));
        }

        self.cancelled.store(false, Ordering::SeqCst);
        let batch_size = adaptive_batch_size(self.options.batch_size, self.monitor.quality());
        self.set_state(SyncState::Syncing);
        self.events.emit(&CycleEvent::CycleStarted { batch_size });
        debug!(batch_size, forced, "sync cycle started");

        let mut report = CycleReport::default();
        let result = self.drain(batch_size, &mut report).await;
        self.finish(report, result)
    }

    async fn drain(&self, batch_size: usize, report: &mut CycleReport) -> Result<()> {
        let mut link = self.link.lock().await;
        link.limiter.reset();
        let mut attempted: HashSet<String> = HashSet::new();

        'cycle: loop {
            let batch: Vec<Record> = self
                .queue
                .dequeue_batch(batch_size + attempted.len())?
                .into_iter()
                .filter(|r| !attempted.contains(&r.id))
                .take(batch_size)
                .collect();
            if batch.is_empty() {
                break;
            }

            for record in batch {
                if self.is_cancelled() {
                    info!("sync cycle cancelled");
                    report.cancelled = true;
                    break 'cycle;
                }
                attempted.insert(record.id.clone());
                if let Flow::Stop = self.replay_one(&mut link, &record, report).await? {
                    break 'cycle;
                }
            }
        }
        Ok(())
    }

    async fn replay_one(&self, link: &mut Link<R>, record: &Record, report: &mut CycleReport) -> Result<Flow> {
        let record = match self.queue.mark_processing(&record.id) {
            Ok(record) => record,
            Err(e) if e.is_storage_exhausted() => return Err(e.into()),
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping record");
                return Ok(Flow::Continue);
            }
        };
        report.attempted += 1;

        link.limiter.acquire().await;
        let request = ReplayRequest::from_record(&record);
        let bytes = request.payload_len();
        let started = Instant::now();
        let outcome = link.remote.replay(request).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(ack) => {
                self.monitor.record_sample(Sample::transfer(elapsed, bytes));
                let processing_time_ms = elapsed.as_millis() as u64;
                self.queue.mark_completed(&record.id, processing_time_ms)?;
                if let Some(clock) = &ack.clock {
                    self.queue.observe_clock(&record.resource_key(), clock)?;
                }
                debug!(id = %record.id, processing_time_ms, "replayed");
                report.completed += 1;
                self.events.emit(&CycleEvent::ItemCompleted { id: record.id.clone(), processing_time_ms });
                Ok(Flow::Continue)
            }
            Err(rejection) => {
                if rejection.kind != RejectionKind::Network {
                    self.monitor.record_sample(Sample::latency(elapsed));
                }
                self.handle_rejection(&record, rejection, report)
            }
        }
    }

    fn handle_rejection(&self, record: &Record, rejection: Rejection, report: &mut CycleReport) -> Result<Flow> {
        let kind = FailureKind::from(rejection.kind);
        match (kind, rejection.remote) {
            (FailureKind::Conflict, Some(snapshot)) => {
                report.conflicts += 1;
                let resolution = self.resolver.handle(&self.queue, record, snapshot)?;
                if resolution == Resolution::Superseded {
                    report.superseded += 1;
                    self.events.emit(&CycleEvent::ItemSuperseded { id: record.id.clone() });
                } else {
                    self.events.emit(&CycleEvent::ConflictDetected { id: record.id.clone(), resolution });
                }
                Ok(Flow::Continue)
            }
            (FailureKind::Conflict, None) => {
                warn!(id = %record.id, "conflict rejection without a snapshot, treating as server failure");
                report.transient_failures += 1;
                self.retry_or_fail(record, FailureKind::Server, &rejection.message, report)?;
                Ok(Flow::Continue)
            }
            (FailureKind::Network, _) => {
                report.transient_failures += 1;
                self.retry_or_fail(record, kind, &rejection.message, report)?;
                // The remote is unreachable; the rest of the batch waits.
                Ok(Flow::Stop)
            }
            (FailureKind::Server, _) => {
                report.transient_failures += 1;
                self.retry_or_fail(record, kind, &rejection.message, report)?;
                Ok(Flow::Continue)
            }
            (FailureKind::Auth, _) => {
                self.fail(record, kind, &rejection.message, report)?;
                Err(Error::Unauthorized(rejection.message))
            }
            (FailureKind::Validation | FailureKind::Storage, _) => {
                self.fail(record, kind, &rejection.message, report)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn retry_or_fail(&self, record: &Record, kind: FailureKind, message: &str, report: &mut CycleReport) -> Result<()> {
        if record.retry_count >= self.queue.max_retries() {
            return self.fail(record, kind, message, report);
        }

        let delay = self.backoff.delay(record.retry_count);
        let updated = self.queue.schedule_retry(&record.id, delay, message)?;
        debug!(id = %record.id, %kind, retry_count = updated.retry_count, ?delay, "retry scheduled");
        report.retrying += 1;
        report.error = Some(format!("{kind}: {message}"));
        self.events.emit(&CycleEvent::ItemRetrying {
            id: record.id.clone(),
            kind,
            retry_count: updated.retry_count,
            delay,
        });
        Ok(())
    }

    fn fail(&self, record: &Record, kind: FailureKind, message: &str, report: &mut CycleReport) -> Result<()> {
        self.queue.mark_failed(&record.id, message)?;
        warn!(id = %record.id, %kind, error = message, "replay failed");
        report.failed += 1;
        report.error = Some(format!("{kind}: {message}"));
        self.events.emit(&CycleEvent::ItemFailed {
            id: record.id.clone(),
            kind,
            error: message.to_string(),
        });
        Ok(())
    }

    fn finish(&self, report: CycleReport, result: Result<()>) -> Result<CycleReport> {
        let now_ms = self.now_ms();
        let now = self.queue.now();
        let mut next = SyncState::Idle;

        {
            let mut control = self.control();
            match &result {
                Ok(()) if report.is_failed_cycle() => {
                    if control.breaker.record_failure(now_ms) {
                        let until_ms = control.breaker.open_until(now_ms).unwrap_or(now_ms);
                        warn!(
                            failures = control.breaker.consecutive_failures(),
                            until_ms,
                            "circuit breaker opened"
                        );
                        next = SyncState::CircuitOpen { until_ms };
                    }
                    control.last_error = report.error.clone();
                }
                Ok(()) if report.completed > 0 => {
                    control.breaker.record_success();
                    control.last_sync = Some(now);
                    control.last_error = report.error.clone();
                }
                // Nothing was due: leave the breaker count and last sync alone.
                Ok(()) if report.attempted == 0 => {}
                Ok(()) => {
                    control.last_error = report.error.clone();
                }
                Err(Error::Unauthorized(message)) => {
                    warn!(error = %message, "remote rejected credentials, pausing");
                    control.last_error = Some(format!("auth: {message}"));
                    next = SyncState::Paused;
                }
                Err(e) => {
                    error!(error = %e, "sync cycle halted");
                    control.last_error = Some(e.to_string());
                }
            }
        }

        self.set_state(next);
        info!(
            attempted = report.attempted,
            completed = report.completed,
            retrying = report.retrying,
            failed = report.failed,
            conflicts = report.conflicts,
            "sync cycle finished"
        );
        self.events.emit(&CycleEvent::CycleFinished(report.clone()));
        result.map(|()| report)
    }

    /// Leaves `Paused`. Returns false if the coordinator was not paused.
    pub fn resume(&self) -> bool {
        let resumed = {
            let mut control = self.control();
            if control.state != SyncState::Paused {
                return false;
            }
            control.last_error = None;
            true
        };
        if resumed {
            info!("sync resumed");
            self.set_state(SyncState::Idle);
            self.wake.notify_one();
        }
        resumed
    }

    /// Stops the current cycle after the in-flight replay.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cancels the current cycle and stops [`run`](Self::run) with all its
    /// timers.
    pub fn shutdown(&self) {
        self.cancel();
        self.shutdown.cancel();
    }

    /// Current status projection.
    pub fn status(&self) -> Result<SyncStatus> {
        let counts = self.queue.counts()?;
        let (last_sync, error) = {
            let control = self.control();
            (control.last_sync, control.last_error.clone())
        };
        Ok(SyncStatus {
            is_online: self.monitor.is_online(),
            sync_in_progress: self.syncing.load(Ordering::SeqCst),
            pending_count: counts.pending + counts.retrying,
            failed_count: counts.failed,
            last_sync,
            error,
            connection_quality: self.monitor.quality(),
        })
    }

    /// Runs cycles on every trigger until [`shutdown`](Self::shutdown).
    ///
    /// Triggers: going online, the periodic timer when `auto_process` is set,
    /// the earliest scheduled retry, the end of a circuit cool-down, and
    /// [`resume`](Self::resume). Returns an error only when storage is
    /// exhausted.
    pub async fn run(&self) -> Result<()> {
        let wake = Arc::clone(&self.wake);
        let subscription = self.monitor.on_connectivity_change(move |change| {
            if change.online {
                wake.notify_one();
            }
        });
        let result = self.run_loop().await;
        self.monitor.unsubscribe(subscription);
        result
    }

    async fn run_loop(&self) -> Result<()> {
        info!("sync loop started");
        while !self.shutdown.is_cancelled() {
            match self.run_cycle().await {
                Ok(report) => {
                    if let Some(reason) = report.skipped {
                        debug!(?reason, "cycle skipped");
                    }
                }
                Err(e) if e.is_storage_exhausted() => {
                    error!(error = %e, "storage exhausted, sync loop stopped");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "sync cycle failed"),
            }

            let wait = self.next_wake()?;
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.wake.notified() => debug!("sync loop woken"),
                _ = sleep_or_forever(wait) => {}
            }
        }
        info!("sync loop stopped");
        Ok(())
    }

    /// How long the run loop may sleep before something is due.
    fn next_wake(&self) -> Result<Option<Duration>> {
        let now_ms = self.now_ms();
        let (state, open_until) = {
            let control = self.control();
            (control.state, control.breaker.open_until(now_ms))
        };

        match state {
            SyncState::Paused => return Ok(None),
            SyncState::CircuitOpen { .. } => {
                let wait = open_until.map_or(MIN_WAKE, |until| Duration::from_millis(until - now_ms));
                return Ok(Some(wait.max(MIN_WAKE)));
            }
            SyncState::Idle | SyncState::Syncing => {}
        }
        if !self.monitor.is_online() {
            return Ok(None);
        }

        let mut wait = self.options.auto_process.then_some(self.options.process_interval);
        if let Some(at) = self.queue.next_retry_at()? {
            let ms = (at.timestamp_millis() - now_ms as i64).max(0) as u64;
            let until_retry = Duration::from_millis(ms).max(MIN_WAKE);
            wait = Some(wait.map_or(until_retry, |w| w.min(until_retry)));
        }
        Ok(wait)
    }
}

async fn sleep_or_forever(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}
