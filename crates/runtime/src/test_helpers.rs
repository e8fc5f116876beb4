// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mock boundaries shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dl_core::{ChangeEvent, ManualClock, Record, RemoteError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStore;
use crate::connectivity::{
    ConnectivityMonitor, ManualSignal, MonitorOptions, Probe, ProbeError, ProbeFuture,
};
use crate::facade::DataAccess;
use crate::notify::Notifier;
use crate::perf::MemorySink;
use crate::remote::{ChannelSpec, Filter, Realtime, RemoteCollection, RemoteFuture, Subscription};
use crate::store::MemoryStore;

/// Probe whose outcome and latency are set by the test.
pub struct MockProbe {
    reachable: AtomicBool,
    calls: AtomicUsize,
    delay: Duration,
}

impl MockProbe {
    pub fn new(reachable: bool) -> Self {
        MockProbe { reachable: AtomicBool::new(reachable), calls: AtomicUsize::new(0), delay: Duration::ZERO }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for MockProbe {
    fn probe(&self) -> ProbeFuture<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reachable = self.reachable.load(Ordering::SeqCst);
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if reachable {
                Ok(())
            } else {
                Err(ProbeError::Unreachable("mock endpoint down".to_string()))
            }
        })
    }
}

/// A monitor wired to mocks, plus handles to drive them.
pub struct MonitorRig {
    pub monitor: ConnectivityMonitor,
    pub probe: Arc<MockProbe>,
    pub signal: Arc<ManualSignal>,
    pub clock: Arc<ManualClock>,
}

impl MonitorRig {
    pub fn new(online: bool) -> Self {
        Self::with_probe(online, MockProbe::new(online))
    }

    pub fn with_probe(signal_online: bool, probe: MockProbe) -> Self {
        let probe = Arc::new(probe);
        let signal = Arc::new(ManualSignal::new(signal_online));
        let clock = Arc::new(ManualClock::new(1_000));
        let monitor = ConnectivityMonitor::new(
            probe.clone(),
            signal.clone(),
            clock.clone(),
            MonitorOptions::default(),
        );
        MonitorRig { monitor, probe, signal, clock }
    }

    /// Drives the monitor offline via the passive signal.
    pub fn go_offline(&self) {
        self.probe.set_reachable(false);
        self.signal.set_online(false);
        self.monitor.mark_offline();
    }

    /// Drives the monitor online through a successful probe.
    pub async fn go_online(&self) {
        self.probe.set_reachable(true);
        self.signal.set_online(true);
        assert!(self.monitor.force_check().await);
    }
}

/// A data facade over an in-memory cache and a mocked monitor.
pub struct FacadeRig {
    pub net: MonitorRig,
    pub data: DataAccess,
    pub cache: CacheStore,
    pub perf: Arc<MemorySink>,
    pub notifier: Notifier,
}

impl FacadeRig {
    pub fn new(online: bool) -> Self {
        let net = MonitorRig::new(online);
        let cache = CacheStore::new(Arc::new(MemoryStore::new()), net.clock.clone());
        let perf = Arc::new(MemorySink::new(64));
        let notifier = Notifier::new();
        let data = DataAccess::new(cache.clone(), net.monitor.clone(), perf.clone(), notifier.clone());
        FacadeRig { net, data, cache, perf, notifier }
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Realtime boundary whose feeds are fed by the test.
#[derive(Default)]
pub struct MockRealtime {
    feeds: Mutex<Vec<(mpsc::Sender<ChangeEvent>, CancellationToken)>>,
    fail_next: Mutex<Option<RemoteError>>,
    calls: AtomicUsize,
}

impl MockRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, err: RemoteError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Delivers an event on the most recent feed. Returns false if that
    /// feed is gone.
    pub async fn push(&self, event: ChangeEvent) -> bool {
        let sender = self.feeds.lock().unwrap().last().map(|(tx, _)| tx.clone());
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Remote-side release token of the most recent feed.
    pub fn last_release(&self) -> CancellationToken {
        self.feeds.lock().unwrap().last().map(|(_, c)| c.clone()).unwrap()
    }

    /// Closes every feed from the remote side.
    pub fn close_all(&self) {
        self.feeds.lock().unwrap().clear();
    }
}

impl Realtime for MockRealtime {
    fn subscribe(&self, _channel: &ChannelSpec) -> RemoteFuture<'_, Subscription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.fail_next.lock().unwrap().take();
        Box::pin(async move {
            if let Some(err) = failure {
                return Err(err);
            }
            let (tx, rx) = mpsc::channel(64);
            let cancel = CancellationToken::new();
            self.feeds.lock().unwrap().push((tx, cancel.clone()));
            Ok(Subscription::new(rx, cancel))
        })
    }
}

/// Remote collection backed by a vector.
pub struct MockCollection<R> {
    rows: Mutex<Vec<R>>,
    upserts: Mutex<Vec<R>>,
    fail_with: Mutex<Option<RemoteError>>,
    fetches: AtomicUsize,
}

impl<R: Record> MockCollection<R> {
    pub fn new(rows: Vec<R>) -> Self {
        MockCollection {
            rows: Mutex::new(rows),
            upserts: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every call fails with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<RemoteError>) {
        *self.fail_with.lock().unwrap() = err;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> Vec<R> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn rows(&self) -> Vec<R> {
        self.rows.lock().unwrap().clone()
    }
}

impl<R: Record> RemoteCollection<R> for MockCollection<R> {
    fn fetch(&self, filter: &Filter) -> RemoteFuture<'_, Vec<R>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let failure = self.fail_with.lock().unwrap().clone();
        let rows: Vec<R> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(&serde_json::to_value(r).unwrap()))
            .cloned()
            .collect();
        Box::pin(async move { failure.map_or(Ok(rows), Err) })
    }

    fn upsert(&self, record: &R) -> RemoteFuture<'_, R> {
        let failure = self.fail_with.lock().unwrap().clone();
        let record = record.clone();
        Box::pin(async move {
            if let Some(err) = failure {
                return Err(err);
            }
            self.upserts.lock().unwrap().push(record.clone());
            let mut rows = self.rows.lock().unwrap();
            match rows.iter().position(|r| r.id() == record.id()) {
                Some(i) => rows[i] = record.clone(),
                None => rows.push(record.clone()),
            }
            Ok(record)
        })
    }
}
