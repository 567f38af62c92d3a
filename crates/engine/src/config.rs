// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Configuration is stored in `<data_dir>/config.toml`. Every field has a
//! default, so a file holding only `device_id` is valid. The camelCase
//! spellings of the queue and sync options are accepted as aliases.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::queue::QueueOptions;
use crate::sync::SyncOptions;

const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "queue.db";
const JOURNAL_FILE_NAME: &str = "conflicts.jsonl";
const LOCK_FILE_NAME: &str = "ebb.lock";
const DATA_DIR_NAME: &str = "ebb";

/// Engine configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Identity of this client in vector clocks.
    #[serde(default, alias = "deviceId")]
    pub device_id: String,

    /// Run cycles on the periodic timer.
    #[serde(default = "default_true", alias = "autoProcess")]
    pub auto_process: bool,
    #[serde(default = "default_process_interval_ms", alias = "processIntervalMs")]
    pub process_interval_ms: u64,
    #[serde(default = "default_max_retries", alias = "maxRetries")]
    pub max_retries: u32,
    #[serde(default = "default_true", alias = "exponentialBackoff")]
    pub exponential_backoff: bool,
    #[serde(default = "default_retry_base_delay_ms", alias = "retryBaseDelayMs")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms", alias = "retryMaxDelayMs")]
    pub retry_max_delay_ms: u64,
    /// Minimum spacing between remote calls within a cycle.
    #[serde(default = "default_rate_limit_delay_ms", alias = "rateLimitDelayMs")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_max_queue_size", alias = "maxQueueSize")]
    pub max_queue_size: usize,
    /// Records per batch on a good link.
    #[serde(default = "default_batch_size", alias = "batchSize")]
    pub batch_size: usize,
    #[serde(default = "default_circuit_breaker_threshold", alias = "circuitBreakerThreshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_circuit_breaker_cooldown_ms", alias = "circuitBreakerCooldownMs")]
    pub circuit_breaker_cooldown_ms: u64,
    #[serde(default = "default_true", alias = "autoResolveConflicts")]
    pub auto_resolve_conflicts: bool,
    /// Age after which completed records are compacted away.
    #[serde(default = "default_cleanup_age_ms", alias = "cleanupAgeMs")]
    pub cleanup_age_ms: u64,

    /// Remote replay endpoint (optional - without it the queue only grows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,

    /// Resource weights used to compute record priority.
    #[serde(default)]
    pub priorities: PriorityWeights,
}

/// Remote replay endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL: `ws://...` or `wss://...`.
    pub url: String,
    /// Bearer token sent with each replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Max time to wait for a connection (default: 5000).
    #[serde(default = "default_connect_timeout_ms", alias = "connectTimeoutMs")]
    pub connect_timeout_ms: u64,
    /// Max time to wait for a replay answer (default: 10000).
    #[serde(default = "default_request_timeout_ms", alias = "requestTimeoutMs")]
    pub request_timeout_ms: u64,
}

impl RemoteConfig {
    /// Creates a remote config with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        RemoteConfig {
            url: url.into(),
            token: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    /// Validates that the URL is a WebSocket URL.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let rest = self.url.strip_prefix("ws://").or_else(|| self.url.strip_prefix("wss://"));
        match rest {
            Some(host) if !host.is_empty() => None,
            Some(_) => Some(format!("invalid remote URL '{}': missing host", self.url)),
            None => Some(format!("invalid remote URL '{}': must be ws:// or wss://", self.url)),
        }
    }
}

/// Per-resource priority weights. Lower weights are replayed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    /// Weight for resource types without an entry.
    #[serde(default = "default_resource_weight")]
    pub default: i64,
    #[serde(flatten)]
    pub resources: BTreeMap<String, i64>,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        PriorityWeights { default: default_resource_weight(), resources: BTreeMap::new() }
    }
}

impl PriorityWeights {
    /// Weight of a resource type.
    pub fn weight(&self, resource_type: &str) -> i64 {
        self.resources.get(resource_type).copied().unwrap_or(self.default)
    }
}

fn default_true() -> bool {
    true
}

fn default_process_interval_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_retry_max_delay_ms() -> u64 {
    300_000
}

fn default_rate_limit_delay_ms() -> u64 {
    100
}

fn default_max_queue_size() -> usize {
    1_000
}

fn default_batch_size() -> usize {
    10
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_cooldown_ms() -> u64 {
    60_000
}

fn default_cleanup_age_ms() -> u64 {
    7 * 24 * 60 * 60 * 1000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_resource_weight() -> i64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Config::new(String::new())
    }
}

impl Config {
    /// Creates a config with defaults for the given device.
    pub fn new(device_id: String) -> Self {
        Config {
            device_id,
            auto_process: true,
            process_interval_ms: default_process_interval_ms(),
            max_retries: default_max_retries(),
            exponential_backoff: true,
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            max_queue_size: default_max_queue_size(),
            batch_size: default_batch_size(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_cooldown_ms: default_circuit_breaker_cooldown_ms(),
            auto_resolve_conflicts: true,
            cleanup_age_ms: default_cleanup_age_ms(),
            remote: None,
            priorities: PriorityWeights::default(),
        }
    }

    /// Parses a config from TOML text and validates it.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the given data directory.
    ///
    /// `EBB_DEVICE_ID` overrides the stored device id.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(Error::NotInitialized(data_dir.display().to_string()));
        }
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let mut config = Config::parse(&content)?;
        if let Some(device_id) = env::device_id() {
            config.device_id = device_id;
            config.validate()?;
        }
        Ok(config)
    }

    /// Saves configuration to the given data directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Checks value ranges and the remote URL.
    pub fn validate(&self) -> Result<()> {
        let id = self.device_id.trim();
        if id.is_empty() {
            return Err(Error::Config("device_id must be set".into()));
        }
        if id.chars().any(|c| c == ':' || c == ',' || c.is_whitespace()) {
            return Err(Error::Config(format!(
                "device_id '{}' may not contain ':', ',' or whitespace",
                self.device_id
            )));
        }
        if self.max_queue_size == 0 {
            return Err(Error::Config("max_queue_size must be greater than 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than 0".into()));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(Error::Config("circuit_breaker_threshold must be greater than 0".into()));
        }
        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(Error::Config(
                "retry_base_delay_ms must not exceed retry_max_delay_ms".into(),
            ));
        }
        if let Some(reason) = self.remote.as_ref().and_then(RemoteConfig::validate_url) {
            return Err(Error::Config(reason));
        }
        Ok(())
    }

    /// Queue manager options derived from this config.
    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            max_queue_size: self.max_queue_size,
            max_retries: self.max_retries,
            cleanup_age: Duration::from_millis(self.cleanup_age_ms),
            priorities: self.priorities.clone(),
        }
    }

    /// Sync coordinator options derived from this config.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            auto_process: self.auto_process,
            process_interval: Duration::from_millis(self.process_interval_ms),
            exponential_backoff: self.exponential_backoff,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(self.retry_max_delay_ms),
            rate_limit_delay: Duration::from_millis(self.rate_limit_delay_ms),
            batch_size: self.batch_size,
            circuit_breaker_threshold: self.circuit_breaker_threshold,
            circuit_breaker_cooldown: Duration::from_millis(self.circuit_breaker_cooldown_ms),
        }
    }
}

/// Resolves the data directory.
///
/// Precedence: explicit path, `EBB_DIR`, `$XDG_DATA_HOME/ebb`, platform data dir.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env::data_dir() {
        return Ok(path);
    }
    if let Some(base) = env::xdg_data_home() {
        return Ok(base.join(DATA_DIR_NAME));
    }
    dirs::data_dir()
        .map(|base| base.join(DATA_DIR_NAME))
        .ok_or_else(|| Error::Config("cannot determine a data directory; set EBB_DIR".into()))
}

/// Path of the queue database in a data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

/// Path of the parked conflict journal in a data directory.
pub fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join(JOURNAL_FILE_NAME)
}

/// Path of the lock file guarding a data directory.
pub fn lock_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOCK_FILE_NAME)
}

/// Derives a device id from a seed, e.g. `dev-3fa94c1e`.
pub fn generate_device_id(seed: &str) -> String {
    let hash = Sha256::digest(seed.as_bytes());
    format!("dev-{}", hex::encode(&hash[..4]))
}

/// Creates the data directory and writes a fresh config.
pub fn init_data_dir(data_dir: &Path, config: &Config) -> Result<()> {
    if data_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(data_dir.display().to_string()));
    }
    config.validate()?;
    fs::create_dir_all(data_dir)?;
    config.save(data_dir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
