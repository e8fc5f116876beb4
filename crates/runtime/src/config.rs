// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration.
//!
//! Configuration is stored as TOML and includes:
//! - `cache`: where the local cache lives and how long entries stay fresh
//! - `connectivity`: probe endpoint, probe timeout and background interval
//! - `retry`: backoff base, cap and the default retry ceiling
//! - `realtime`: optional WebSocket endpoint for change events
//!
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

const APP_DIR_NAME: &str = "driftless";
const CACHE_FILE_NAME: &str = "cache.db";

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Local cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// SQLite file backing the cache. Absent means an in-memory cache that
    /// does not survive restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Default freshness window for cached reads, in milliseconds.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

/// Connectivity probing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// `host:port` that an active probe connects to.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,
    /// Hard timeout for a single probe, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Background re-probe interval in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Retry/backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,
    /// Retries allowed after the first attempt before giving up.
    #[serde(default = "default_ceiling")]
    pub ceiling: u32,
}

/// Realtime feed settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint publishing change events (`ws://` or `wss://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_max_age_ms() -> u64 {
    300_000
}

fn default_probe_addr() -> String {
    "1.1.1.1:443".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_interval_secs() -> u64 {
    30
}

fn default_base_ms() -> u64 {
    2_000
}

fn default_cap_ms() -> u64 {
    30_000
}

fn default_ceiling() -> u32 {
    3
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { path: None, max_age_ms: default_max_age_ms() }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        ConnectivityConfig {
            probe_addr: default_probe_addr(),
            probe_timeout_ms: default_probe_timeout_ms(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig { base_ms: default_base_ms(), cap_ms: default_cap_ms(), ceiling: default_ceiling() }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

impl ConnectivityConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base: Duration::from_millis(self.base_ms),
            cap: Duration::from_millis(self.cap_ms),
            ceiling: self.ceiling,
        }
    }
}

impl RealtimeConfig {
    /// Validates that the URL, if any, is a WebSocket URL.
    ///
    /// Returns an error message if the URL is invalid.
    pub fn validate_url(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        if url.starts_with("ws://") || url.starts_with("wss://") {
            return None;
        }
        Some(format!("invalid realtime URL '{}': must be ws:// or wss://", url))
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Checks the invariants the runtime relies on.
    pub fn validate(&self) -> Result<()> {
        if self.connectivity.probe_timeout_ms == 0 {
            return Err(Error::Config("connectivity.probe_timeout_ms must be > 0".to_string()));
        }
        if self.connectivity.interval_secs == 0 {
            return Err(Error::Config("connectivity.interval_secs must be > 0".to_string()));
        }
        if self.connectivity.probe_addr.trim().is_empty() {
            return Err(Error::Config("connectivity.probe_addr cannot be empty".to_string()));
        }
        if self.retry.base_ms == 0 {
            return Err(Error::Config("retry.base_ms must be > 0".to_string()));
        }
        if self.retry.base_ms > self.retry.cap_ms {
            return Err(Error::Config(format!(
                "retry.base_ms ({}) cannot exceed retry.cap_ms ({})",
                self.retry.base_ms, self.retry.cap_ms
            )));
        }
        if self.retry.ceiling == 0 {
            return Err(Error::Config("retry.ceiling must be >= 1".to_string()));
        }
        if let Some(msg) = self.realtime.validate_url() {
            return Err(Error::Config(msg));
        }
        Ok(())
    }

    /// Returns a config whose cache lives in the platform cache directory.
    pub fn with_default_cache_path(mut self) -> Self {
        self.cache.path = Some(default_cache_path());
        self
    }
}

/// Platform cache location, e.g. `~/.cache/driftless/cache.db`.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(CACHE_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
