// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Vector clocks for telling concurrent edits from causally ordered ones.
//!
//! Every resource carries its own clock: a map from device identifier to a
//! counter. A device bumps its own component each time it produces a new
//! version of the resource, and merges in whatever it learns from the remote.
//!
//! Format: `dev1:3,dev2:1` (components sorted by device id, empty clock is `-`)
//!
//! Comparison rules:
//! 1. Missing components count as zero
//! 2. A dominates B when every component is >= and at least one is >
//! 3. Neither dominating (and not equal) means the clocks are concurrent

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// How two vector clocks relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Causality {
    /// Both clocks have identical components.
    Equal,
    /// The left clock dominates the right one.
    After,
    /// The right clock dominates the left one.
    Before,
    /// Neither clock dominates.
    Concurrent,
}

/// A per-resource vector of per-device counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    counters: BTreeMap<String, u64>,
}

impl VectorClock {
    /// Creates an empty clock.
    pub fn new() -> Self {
        VectorClock::default()
    }

    /// Returns the counter for a device (zero when absent).
    pub fn get(&self, device: &str) -> u64 {
        self.counters.get(device).copied().unwrap_or(0)
    }

    /// Sets the counter for a device.
    pub fn set(&mut self, device: impl Into<String>, counter: u64) {
        self.counters.insert(device.into(), counter);
    }

    /// Bumps a device's component and returns the new value.
    pub fn increment(&mut self, device: &str) -> u64 {
        let counter = self.counters.entry(device.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Returns true if no device has a component.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Iterates components in device order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(d, c)| (d.as_str(), *c))
    }

    /// Component-wise maximum of two clocks.
    pub fn merge(&self, other: &VectorClock) -> VectorClock {
        let mut merged = self.clone();
        merged.merge_in_place(other);
        merged
    }

    /// Folds another clock into this one, component-wise.
    pub fn merge_in_place(&mut self, other: &VectorClock) {
        for (device, counter) in &other.counters {
            let entry = self.counters.entry(device.clone()).or_insert(0);
            if *counter > *entry {
                *entry = *counter;
            }
        }
    }

    /// Compares two clocks.
    pub fn compare(&self, other: &VectorClock) -> Causality {
        let mut greater = false;
        let mut less = false;

        for device in self.counters.keys().chain(other.counters.keys()) {
            let ours = self.get(device);
            let theirs = other.get(device);
            if ours > theirs {
                greater = true;
            } else if ours < theirs {
                less = true;
            }
            if greater && less {
                return Causality::Concurrent;
            }
        }

        match (greater, less) {
            (false, false) => Causality::Equal,
            (true, false) => Causality::After,
            (false, true) => Causality::Before,
            (true, true) => Causality::Concurrent,
        }
    }

    /// Returns true if this clock strictly dominates the other.
    pub fn dominates(&self, other: &VectorClock) -> bool {
        self.compare(other) == Causality::After
    }

    /// Returns true if neither clock dominates the other.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self.compare(other) == Causality::Concurrent
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counters.is_empty() {
            return write!(f, "-");
        }
        let parts: Vec<String> =
            self.counters.iter().map(|(d, c)| format!("{d}:{c}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for VectorClock {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut clock = VectorClock::new();
        if s.is_empty() || s == "-" {
            return Ok(clock);
        }

        for part in s.split(',') {
            let (device, counter) = part.split_once(':').ok_or_else(|| {
                Error::InvalidClock(format!("expected 'device:counter', got '{part}'"))
            })?;
            let device = device.trim();
            if device.is_empty() {
                return Err(Error::InvalidClock(format!("empty device id in '{s}'")));
            }
            let counter = counter
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::InvalidClock(format!("invalid counter '{counter}' in '{s}'")))?;
            clock.set(device, counter);
        }

        Ok(clock)
    }
}

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

impl<C: ClockSource> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        (*self).now_ms()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Builds the key a resource's clock is filed under.
pub fn resource_key(resource_type: &str, resource_id: &str) -> String {
    format!("{resource_type}/{resource_id}")
}

/// Hands out vector clock stamps for the resources this device mutates.
///
/// Thread-safe. Each [`tick`](ClockAuthority::tick) produces a clock whose own
/// component is strictly greater than anything previously observed for this
/// device on that resource.
pub struct ClockAuthority {
    device_id: String,
    clocks: Mutex<HashMap<String, VectorClock>>,
}

impl ClockAuthority {
    /// Creates an authority for the given device with no history.
    pub fn new(device_id: impl Into<String>) -> Self {
        ClockAuthority { device_id: device_id.into(), clocks: Mutex::new(HashMap::new()) }
    }

    /// Creates an authority seeded with previously persisted clocks.
    pub fn with_clocks(
        device_id: impl Into<String>,
        clocks: impl IntoIterator<Item = (String, VectorClock)>,
    ) -> Self {
        ClockAuthority {
            device_id: device_id.into(),
            clocks: Mutex::new(clocks.into_iter().collect()),
        }
    }

    /// Returns the device this authority stamps for.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the latest known clock for a resource (empty if never seen).
    pub fn current(&self, key: &str) -> VectorClock {
        let clocks = self.clocks.lock().unwrap_or_else(|e| e.into_inner());
        clocks.get(key).cloned().unwrap_or_default()
    }

    /// Advances this device's component for a resource and returns the stamp.
    pub fn tick(&self, key: &str) -> VectorClock {
        let mut clocks = self.clocks.lock().unwrap_or_else(|e| e.into_inner());
        let clock = clocks.entry(key.to_string()).or_default();
        clock.increment(&self.device_id);
        clock.clone()
    }

    /// Merges a clock learned from elsewhere into the resource's clock.
    ///
    /// Returns the merged clock.
    pub fn observe(&self, key: &str, seen: &VectorClock) -> VectorClock {
        let mut clocks = self.clocks.lock().unwrap_or_else(|e| e.into_inner());
        let clock = clocks.entry(key.to_string()).or_default();
        clock.merge_in_place(seen);
        clock.clone()
    }

    /// Merges `seen` and then ticks, producing a stamp that dominates both
    /// the local history and `seen`.
    pub fn observe_and_tick(&self, key: &str, seen: &VectorClock) -> VectorClock {
        let mut clocks = self.clocks.lock().unwrap_or_else(|e| e.into_inner());
        let clock = clocks.entry(key.to_string()).or_default();
        clock.merge_in_place(seen);
        clock.increment(&self.device_id);
        clock.clone()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
