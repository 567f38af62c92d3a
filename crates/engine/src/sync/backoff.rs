// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry pacing: backoff delays, the circuit breaker, and rate limiting.

use std::time::Duration;

use tokio::time::Instant;

/// Delay before the n-th retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub exponential: bool,
    pub base: Duration,
    pub cap: Duration,
}

impl BackoffPolicy {
    /// `min(base * 2^n, cap)` when exponential, `base` otherwise.
    pub fn delay(&self, retry_count: u32) -> Duration {
        if !self.exponential {
            return self.base;
        }
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base.checked_mul(factor).unwrap_or(Duration::MAX).min(self.cap)
    }
}

/// Opens after `threshold` consecutive failed cycles and stays open for
/// `cooldown`.
///
/// Times are epoch milliseconds from the coordinator's clock source.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    open_until_ms: Option<u64>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        CircuitBreaker { threshold: threshold.max(1), cooldown, consecutive_failures: 0, open_until_ms: None }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// When the breaker is open, the time it closes again.
    pub fn open_until(&self, now_ms: u64) -> Option<u64> {
        self.open_until_ms.filter(|&until| until > now_ms)
    }

    /// Returns true if a cycle may run at `now_ms`.
    ///
    /// An expired cool-down closes the breaker and resets the counter.
    pub fn allow(&mut self, now_ms: u64) -> bool {
        match self.open_until_ms {
            Some(until) if until > now_ms => false,
            Some(_) => {
                self.open_until_ms = None;
                self.consecutive_failures = 0;
                true
            }
            None => true,
        }
    }

    /// Counts a failed cycle. Returns true if this trips the breaker.
    pub fn record_failure(&mut self, now_ms: u64) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            let cooldown = self.cooldown.as_millis() as u64;
            self.open_until_ms = Some(now_ms.saturating_add(cooldown));
            return true;
        }
        false
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.open_until_ms = None;
    }
}

/// Keeps at least `spacing` between consecutive remote calls.
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(spacing: Duration) -> Self {
        RateLimiter { spacing, last: None }
    }

    /// Waits until the next call may go out, then claims the slot.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.spacing).await;
        }
        self.last = Some(Instant::now());
    }

    /// Forgets the previous call, so the next `acquire` returns at once.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
