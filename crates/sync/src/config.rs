// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync layer configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard tuning. Configuration can be loaded from a `kerbside.toml`:
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! base_delays_ms = [1000, 2000, 5000]
//! jitter_ms = 1000
//!
//! [reconnect]
//! max_attempts = 5
//!
//! [cache]
//! listings_ttl_secs = 300
//! in_memory = false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::default_cache_dir;
use crate::error::{Result, SyncError};

/// Top-level configuration for a [`crate::SyncClient`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

/// Backoff for one-shot remote calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per call when the caller does not pick a number (default: 3).
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    /// Delay before retry N; the last entry repeats (default: 1s, 2s, 5s).
    #[serde(default = "default_base_delays_ms")]
    pub base_delays_ms: Vec<u64>,
    /// Upper bound of the random delay added to each backoff (default: 1000).
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

/// Reconnect schedule for the live listings subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnects scheduled before giving up (default: 5).
    #[serde(default = "default_reconnect_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first reconnect, doubled each time (default: 1000).
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap on the reconnect delay (default: 30000).
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long cached listings stay usable (default: 300).
    #[serde(default = "default_listings_ttl_secs")]
    pub listings_ttl_secs: u64,
    /// Directory for the file-backed cache (default: the platform cache
    /// directory plus `kerbside`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Keep cached listings in memory only (default: false).
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How often status pollers re-read the connection state (default: 2000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum listings per snapshot (default: 50).
    #[serde(default = "default_query_limit")]
    pub limit: usize,
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_base_delays_ms() -> Vec<u64> {
    vec![1_000, 2_000, 5_000]
}

fn default_jitter_ms() -> u64 {
    1_000
}

fn default_reconnect_max_attempts() -> u32 {
    5
}

fn default_reconnect_initial_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_listings_ttl_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_query_limit() -> usize {
    50
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_retry_max_attempts(),
            base_delays_ms: default_base_delays_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            max_attempts: default_reconnect_max_attempts(),
            initial_delay_ms: default_reconnect_initial_delay_ms(),
            max_delay_ms: default_reconnect_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            listings_ttl_secs: default_listings_ttl_secs(),
            dir: None,
            in_memory: false,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            limit: default_query_limit(),
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect number `attempt` (1-based):
    /// `min(initial * 2^(attempt-1), max)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let ms = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

impl CacheConfig {
    pub fn listings_ttl(&self) -> Duration {
        Duration::from_secs(self.listings_ttl_secs)
    }

    /// Where listings are persisted, or `None` to keep them in memory.
    pub fn location(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        self.dir.clone().or_else(default_cache_dir)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SyncConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the sync layer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delays_ms.is_empty() {
            return Err(SyncError::Config(
                "retry.base_delays_ms cannot be empty".to_string(),
            ));
        }
        if self.reconnect.initial_delay_ms == 0 {
            return Err(SyncError::Config(
                "reconnect.initial_delay_ms must be positive".to_string(),
            ));
        }
        if self.cache.listings_ttl_secs == 0 {
            return Err(SyncError::Config(
                "cache.listings_ttl_secs must be positive".to_string(),
            ));
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(SyncError::Config(
                "monitor.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.query.limit == 0 {
            return Err(SyncError::Config(
                "query.limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
