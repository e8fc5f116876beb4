// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-bounded cache over the persistence boundary.
//!
//! Payloads are stored as JSON together with the wall-clock time they were
//! saved. An entry is fresh while `now - stored_at <= max_age`. Expired,
//! missing, corrupt and mismatched entries all read as absent: a caller has
//! to fetch in every one of those cases, so they are not told apart.
//!
//! Persistence failures are logged and swallowed. A broken entry heals the
//! next time its key is saved.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use dl_core::{merge_fields, CacheKey, ClockSource, TypeTag};

use crate::store::KvStore;

/// A payload as it sits in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    /// Milliseconds since Unix epoch.
    pub stored_at: u64,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is still within `max_age` at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64, max_age: Duration) -> bool {
        let age = now_ms.saturating_sub(self.stored_at);
        u128::from(age) <= max_age.as_millis()
    }
}

/// Key-addressed cache shared by every runtime component.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn ClockSource>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn ClockSource>) -> Self {
        CacheStore { store, clock }
    }

    /// Stores `payload` under `key`, stamped with the current time.
    pub fn save<T: Serialize>(&self, key: &CacheKey, payload: &T) {
        let entry = CacheEntry { key: key.to_string(), payload, stored_at: self.clock.now_ms() };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, "failed to serialize cache entry: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&entry.key, &bytes) {
            tracing::warn!(key = %key, "failed to write cache entry: {}", e);
        }
    }

    /// Returns the payload if it was saved no more than `max_age` ago.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey, max_age: Duration) -> Option<T> {
        let entry = self.load::<T>(key)?;
        if entry.is_fresh(self.clock.now_ms(), max_age) {
            tracing::debug!(key = %key, "cache hit");
            Some(entry.payload)
        } else {
            tracing::debug!(key = %key, "cache entry expired");
            None
        }
    }

    /// Returns the payload regardless of age.
    ///
    /// Only the offline fallback path should use this.
    pub fn get_stale<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.load::<T>(key).map(|entry| entry.payload)
    }

    /// Merges a JSON field patch into an existing entry and restamps it.
    ///
    /// Returns false when there is no readable entry to patch; no entry is
    /// created in that case.
    pub fn merge(&self, key: &CacheKey, patch: &Value) -> bool {
        let Some(mut entry) = self.load::<Value>(key) else {
            return false;
        };
        merge_fields(&mut entry.payload, patch);
        self.save(key, &entry.payload);
        true
    }

    /// Removes a single entry. Removing an absent key is fine.
    pub fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.store.remove(&key.to_string()) {
            tracing::warn!(key = %key, "failed to remove cache entry: {}", e);
        }
    }

    /// Removes every entry whose key carries `tag`.
    pub fn invalidate_tag(&self, tag: TypeTag) {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(%tag, "failed to list cache keys: {}", e);
                return;
            }
        };
        for raw in keys {
            if CacheKey::parse(&raw).is_ok_and(|key| key.tag == tag) {
                if let Err(e) = self.store.remove(&raw) {
                    tracing::warn!(key = %raw, "failed to remove cache entry: {}", e);
                }
            }
        }
    }

    /// Removes everything, e.g. on sign-out.
    pub fn invalidate_all(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear cache: {}", e);
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let raw_key = key.to_string();
        let bytes = match self.store.get(&raw_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, "failed to read cache entry: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
            Ok(entry) if entry.key == raw_key => Some(entry),
            Ok(entry) => {
                tracing::warn!(key = %key, stored = %entry.key, "cache entry key mismatch, ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, "corrupt cache entry, ignoring: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
