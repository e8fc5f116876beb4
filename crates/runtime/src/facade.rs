// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Data access facade.
//!
//! Read path:
//! 1. `use_cache` and a fresh entry: return it, no remote call
//! 2. Offline: return the cached entry regardless of age (degraded), or a
//!    `Network` error; the remote is not called
//! 3. Otherwise call the remote and write the result through to the cache
//! 4. On failure classify it; `Network` failures fall back to any cached
//!    entry, everything else is surfaced
//!
//! Writes never read the cache. A successful write patches the entity's
//! cache entry field by field so later reads are not stale.
//!
//! Every operation records a [`PerfSample`] whatever its outcome, and no
//! remote failure escapes as anything but a [`DataError`] in the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dl_core::{
    classify, CacheKey, ErrorKind, ItemCount, RemoteError, Validate, ValidationError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheStore;
use crate::connectivity::ConnectivityMonitor;
use crate::notify::{Notice, Notifier};
use crate::perf::{PerfSample, PerfSink};
use crate::retry::RetryCoordinator;

/// Annotation carried by reads served from cache because the network is down.
pub const OFFLINE_CACHE_MESSAGE: &str = "using cached data (offline)";

const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Serve a fresh cache entry without calling the remote.
    pub use_cache: bool,
    /// Freshness window for cache hits.
    pub max_age: Duration,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { use_cache: true, max_age: DEFAULT_MAX_AGE }
    }
}

impl ReadOptions {
    /// Skip the cache lookup; the result is still written through.
    pub fn refresh() -> Self {
        ReadOptions { use_cache: false, ..ReadOptions::default() }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// A classified failure, returned inside an outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DataError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DataError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        DataError { kind, message: message.into() }
    }

    pub fn from_remote(err: &RemoteError, kind: ErrorKind) -> Self {
        DataError { kind, message: err.message.clone() }
    }

    pub fn offline() -> Self {
        DataError::new(ErrorKind::Network, ErrorKind::Network.user_message())
    }

    pub fn offline_cache() -> Self {
        DataError::new(ErrorKind::Network, OFFLINE_CACHE_MESSAGE)
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl From<ValidationError> for DataError {
    fn from(err: ValidationError) -> Self {
        DataError::new(ErrorKind::Validation, err.to_string())
    }
}

/// Result of a read.
///
/// A degraded read has both `data` and `error`: the data came from an
/// expired cache entry because the remote could not be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome<T> {
    pub data: Option<T>,
    pub error: Option<DataError>,
    pub is_from_cache: bool,
}

impl<T> ReadOutcome<T> {
    fn fetched(data: T) -> Self {
        ReadOutcome { data: Some(data), error: None, is_from_cache: false }
    }

    fn cached(data: T) -> Self {
        ReadOutcome { data: Some(data), error: None, is_from_cache: true }
    }

    fn degraded(data: T) -> Self {
        ReadOutcome { data: Some(data), error: Some(DataError::offline_cache()), is_from_cache: true }
    }

    fn failed(error: DataError) -> Self {
        ReadOutcome { data: None, error: Some(error), is_from_cache: false }
    }

    pub fn is_degraded(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    /// Data if there is any (degraded included), the error otherwise.
    pub fn into_result(self) -> Result<T, DataError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(err)) => Err(err),
            (None, None) => Err(DataError::new(ErrorKind::Generic, "no data")),
        }
    }
}

/// Result of a write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome<T> {
    pub data: Option<T>,
    pub error: Option<DataError>,
}

impl<T> WriteOutcome<T> {
    fn ok(data: T) -> Self {
        WriteOutcome { data: Some(data), error: None }
    }

    fn failed(error: DataError) -> Self {
        WriteOutcome { data: None, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<T, DataError> {
        match (self.data, self.error) {
            (_, Some(err)) => Err(err),
            (Some(data), None) => Ok(data),
            (None, None) => Err(DataError::new(ErrorKind::Generic, "no data")),
        }
    }
}

/// Cache-aside access to the remote service.
#[derive(Clone)]
pub struct DataAccess {
    cache: CacheStore,
    monitor: ConnectivityMonitor,
    perf: Arc<dyn PerfSink>,
    notifier: Notifier,
}

impl DataAccess {
    pub fn new(
        cache: CacheStore,
        monitor: ConnectivityMonitor,
        perf: Arc<dyn PerfSink>,
        notifier: Notifier,
    ) -> Self {
        DataAccess { cache, monitor, perf, notifier }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Reads `key`, calling `remote` at most once.
    pub async fn read<T, F, Fut>(
        &self,
        name: &str,
        key: &CacheKey,
        options: ReadOptions,
        remote: F,
    ) -> ReadOutcome<T>
    where
        T: Serialize + DeserializeOwned + ItemCount,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let started = Instant::now();
        let outcome = match self.short_circuit(key, options) {
            Some(outcome) => outcome,
            None => match remote().await {
                Ok(data) => self.write_through(key, data),
                Err(err) => self.recover(name, key, &err),
            },
        };
        self.sample(name, started, outcome.data.item_count());
        outcome
    }

    /// Like [`read`](Self::read) but retries `Network` failures with
    /// `retry`'s backoff while the monitor believes the network is up.
    ///
    /// Crossing the retry ceiling publishes one warning notice.
    pub async fn read_with_retry<T, F, Fut>(
        &self,
        name: &str,
        key: &CacheKey,
        options: ReadOptions,
        retry: &mut RetryCoordinator,
        remote: F,
    ) -> ReadOutcome<T>
    where
        T: Serialize + DeserializeOwned + ItemCount,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let started = Instant::now();
        let outcome = match self.short_circuit(key, options) {
            Some(outcome) => outcome,
            None => {
                let monitor = &self.monitor;
                let result = retry
                    .run(remote, |err| monitor.believes_online() && classify(err, true).is_retryable())
                    .await;
                match result {
                    Ok(data) => self.write_through(key, data),
                    Err(failure) => {
                        if failure.exhausted {
                            tracing::warn!(op = name, attempts = failure.attempts, "giving up: {}", failure.error);
                            self.notifier.notify(Notice::warning(
                                name,
                                format!("{} is unavailable after {} retries", name, failure.attempts),
                            ));
                        }
                        self.recover(name, key, &failure.error)
                    }
                }
            }
        };
        self.sample(name, started, outcome.data.item_count());
        outcome
    }

    /// Calls `remote` and, on success, merges the result into `target`'s
    /// cache entry if there is one.
    ///
    /// `target` should name the entry holding the written entity itself
    /// (e.g. `profile_42`), not a list that contains it.
    pub async fn write<T, F, Fut>(&self, name: &str, target: Option<&CacheKey>, remote: F) -> WriteOutcome<T>
    where
        T: Serialize + ItemCount,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let started = Instant::now();
        let outcome = match remote().await {
            Ok(data) => {
                if let Some(key) = target {
                    self.patch_cache(key, &data);
                }
                WriteOutcome::ok(data)
            }
            Err(err) => {
                let kind = classify(&err, self.monitor.believes_online());
                if kind == ErrorKind::Network {
                    tracing::debug!(op = name, "remote write failed: {}", err);
                } else {
                    tracing::warn!(op = name, %kind, "remote write rejected: {}", err);
                }
                WriteOutcome::failed(DataError::from_remote(&err, kind))
            }
        };
        self.sample(name, started, outcome.data.item_count());
        outcome
    }

    /// Validates `input` locally first; the remote is only called if it passes.
    pub async fn write_validated<V, T, F, Fut>(
        &self,
        name: &str,
        input: &V,
        target: Option<&CacheKey>,
        remote: F,
    ) -> WriteOutcome<T>
    where
        V: Validate + ?Sized,
        T: Serialize + ItemCount,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        if let Err(err) = input.validate() {
            tracing::debug!(op = name, "rejected before write: {}", err);
            self.sample(name, Instant::now(), 0);
            return WriteOutcome::failed(err.into());
        }
        self.write(name, target, remote).await
    }

    fn short_circuit<T: DeserializeOwned>(&self, key: &CacheKey, options: ReadOptions) -> Option<ReadOutcome<T>> {
        if options.use_cache {
            if let Some(data) = self.cache.get(key, options.max_age) {
                return Some(ReadOutcome::cached(data));
            }
        }
        if self.monitor.believes_online() {
            return None;
        }
        tracing::debug!(key = %key, "offline, not calling remote");
        Some(match self.cache.get_stale(key) {
            Some(data) => ReadOutcome::degraded(data),
            None => ReadOutcome::failed(DataError::offline()),
        })
    }

    fn write_through<T: Serialize>(&self, key: &CacheKey, data: T) -> ReadOutcome<T> {
        self.cache.save(key, &data);
        ReadOutcome::fetched(data)
    }

    fn recover<T: DeserializeOwned>(&self, name: &str, key: &CacheKey, err: &RemoteError) -> ReadOutcome<T> {
        let kind = classify(err, self.monitor.believes_online());
        if kind == ErrorKind::Network {
            if let Some(data) = self.cache.get_stale(key) {
                tracing::info!(op = name, key = %key, "remote unreachable, serving cached data");
                return ReadOutcome::degraded(data);
            }
            tracing::debug!(op = name, "remote unreachable and nothing cached: {}", err);
        } else {
            tracing::warn!(op = name, %kind, "remote read failed: {}", err);
        }
        ReadOutcome::failed(DataError::from_remote(err, kind))
    }

    fn patch_cache<T: Serialize>(&self, key: &CacheKey, data: &T) {
        match serde_json::to_value(data) {
            Ok(patch) => {
                if self.cache.merge(key, &patch) {
                    tracing::debug!(key = %key, "patched cache after write");
                }
            }
            Err(e) => tracing::warn!(key = %key, "cannot patch cache after write: {}", e),
        }
    }

    fn sample(&self, name: &str, started: Instant, item_count: usize) {
        self.perf.record(PerfSample::new(name, started.elapsed(), item_count));
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
