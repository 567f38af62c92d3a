// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network monitor: connectivity and link quality.
//!
//! The monitor never retries anything. It keeps the latest connectivity flag
//! and a rolling window of latency/throughput samples, derives a quality
//! tier from them, and tells subscribers when either changes.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::{Subscribers, SubscriptionId};

/// Samples kept for the quality estimate.
pub const SAMPLE_WINDOW: usize = 8;

const GOOD_LATENCY_MS: u64 = 150;
const GOOD_THROUGHPUT_KBPS: u64 = 1_000;
const FAIR_LATENCY_MS: u64 = 600;
/// Smaller transfers are dominated by latency and carry no throughput.
pub const MIN_THROUGHPUT_BYTES: usize = 16 * 1024;

/// Link quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Fair,
    Slow,
    Offline,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "good",
            Quality::Fair => "fair",
            Quality::Slow => "slow",
            Quality::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observation of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub latency_ms: u64,
    /// Measured throughput, when the observation moved enough data to tell.
    pub throughput_kbps: Option<u64>,
}

impl Sample {
    pub fn latency(latency: Duration) -> Self {
        Sample { latency_ms: latency.as_millis() as u64, throughput_kbps: None }
    }

    /// A round trip that moved `bytes` in `elapsed`.
    pub fn transfer(elapsed: Duration, bytes: usize) -> Self {
        let latency_ms = elapsed.as_millis() as u64;
        // bits per millisecond is kbit/s
        let throughput_kbps =
            (bytes >= MIN_THROUGHPUT_BYTES && latency_ms > 0).then(|| bytes as u64 * 8 / latency_ms);
        Sample { latency_ms, throughput_kbps }
    }
}

/// Delivered to `on_connectivity_change` subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityChange {
    pub online: bool,
    pub quality: Quality,
}

struct MonitorState {
    online: bool,
    samples: VecDeque<Sample>,
}

impl MonitorState {
    fn quality(&self) -> Quality {
        if !self.online {
            return Quality::Offline;
        }
        if self.samples.is_empty() {
            return Quality::Good;
        }

        let n = self.samples.len() as u64;
        let latency = self.samples.iter().map(|s| s.latency_ms).sum::<u64>() / n;
        let throughputs: Vec<u64> = self.samples.iter().filter_map(|s| s.throughput_kbps).collect();
        let fast_enough = throughputs.is_empty()
            || throughputs.iter().sum::<u64>() / throughputs.len() as u64 >= GOOD_THROUGHPUT_KBPS;

        if latency < GOOD_LATENCY_MS && fast_enough {
            Quality::Good
        } else if latency < FAIR_LATENCY_MS {
            Quality::Fair
        } else {
            Quality::Slow
        }
    }
}

/// Tracks connectivity and link quality.
pub struct NetworkMonitor {
    state: Mutex<MonitorState>,
    subscribers: Subscribers<ConnectivityChange>,
}

impl NetworkMonitor {
    /// Creates a monitor with the given initial connectivity.
    pub fn new(online: bool) -> Self {
        NetworkMonitor {
            state: Mutex::new(MonitorState { online, samples: VecDeque::with_capacity(SAMPLE_WINDOW) }),
            subscribers: Subscribers::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    pub fn quality(&self) -> Quality {
        self.lock().quality()
    }

    /// Subscribes to connectivity and quality transitions.
    pub fn on_connectivity_change(
        &self,
        handler: impl Fn(&ConnectivityChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Reports connectivity. Going offline clears the sample window.
    pub fn set_online(&self, online: bool) {
        self.apply(|state| {
            state.online = online;
            if !online {
                state.samples.clear();
            }
        });
    }

    /// Adds a link sample to the rolling window.
    pub fn record_sample(&self, sample: Sample) {
        self.apply(|state| {
            if state.samples.len() == SAMPLE_WINDOW {
                state.samples.pop_front();
            }
            state.samples.push_back(sample);
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutates the state and emits an event if the observable view changed.
    fn apply(&self, f: impl FnOnce(&mut MonitorState)) {
        let change = {
            let mut state = self.lock();
            let before = (state.online, state.quality());
            f(&mut state);
            let after = (state.online, state.quality());
            (before != after).then_some(ConnectivityChange { online: after.0, quality: after.1 })
        };

        if let Some(change) = change {
            if change.online {
                info!(quality = %change.quality, "network online");
            } else {
                info!("network offline");
            }
            self.subscribers.emit(&change);
        }
    }
}

/// A reachability check, e.g. a TCP connect to the remote.
pub trait Probe: Send + Sync {
    /// Returns the round-trip time, or `None` when unreachable.
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>>;
}

/// Probes by opening a TCP connection.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe { addr: addr.into(), timeout }
    }

    /// Builds a probe for the host and port of a `ws://` or `wss://` URL.
    pub fn for_url(url: &str, timeout: Duration) -> Option<Self> {
        probe_address(url).map(|addr| TcpProbe::new(addr, timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Probe for TcpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = Option<Duration>> + Send + '_>> {
        Box::pin(async move {
            let started = Instant::now();
            match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&self.addr)).await {
                Ok(Ok(_)) => Some(started.elapsed()),
                Ok(Err(e)) => {
                    debug!(addr = %self.addr, error = %e, "probe failed");
                    None
                }
                Err(_) => {
                    debug!(addr = %self.addr, "probe timed out");
                    None
                }
            }
        })
    }
}

/// Extracts `host:port` from a WebSocket URL, filling in the default port.
pub fn probe_address(url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("wss://") {
        (rest, 443)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    if authority.is_empty() {
        return None;
    }

    let has_port = match authority.rfind(':') {
        Some(idx) => !authority.ends_with(']') && authority[idx + 1..].chars().all(|c| c.is_ascii_digit()),
        None => false,
    };
    if has_port {
        Some(authority.to_string())
    } else {
        Some(format!("{authority}:{default_port}"))
    }
}

/// Probes on an interval and feeds the monitor until cancelled.
pub async fn watch(monitor: &NetworkMonitor, probe: &dyn Probe, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        probe_once(monitor, probe).await;
    }
}

/// Runs one probe and feeds the result to the monitor. Returns whether the
/// remote was reachable.
pub async fn probe_once(monitor: &NetworkMonitor, probe: &dyn Probe) -> bool {
    match probe.probe().await {
        Some(rtt) => {
            monitor.set_online(true);
            monitor.record_sample(Sample::latency(rtt));
            true
        }
        None => {
            monitor.set_online(false);
            false
        }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
