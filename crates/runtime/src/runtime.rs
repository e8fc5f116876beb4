// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime object.
//!
//! Owns one of each shared component (cache, monitor, notifier, facade) and
//! hands out per-context helpers. Everything is built by [`Runtime::init`]
//! and torn down by [`Runtime::shutdown`]; nothing is global.

use std::sync::{Arc, Mutex, MutexGuard};

use dl_core::{CacheKey, ClockSource, ProfileRecord, Record, SystemClock};
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::connectivity::{ConnectivityMonitor, ManualSignal, MonitorOptions, PassiveSignal, Probe, TcpProbe};
use crate::error::{Error, Result};
use crate::facade::{DataAccess, ReadOptions};
use crate::notify::Notifier;
use crate::perf::{PerfSink, TracingSink};
use crate::profile::ProfileSync;
use crate::realtime::{LiveCollection, LiveSources, WebSocketFeed};
use crate::remote::{ChannelSpec, Realtime, RemoteCollection};
use crate::retry::RetryCoordinator;
use crate::store::{KvStore, MemoryStore, SqliteStore};

/// Boundary collaborators injected into a [`Runtime`].
#[derive(Clone)]
pub struct RuntimeDeps {
    pub probe: Arc<dyn Probe>,
    pub signal: Arc<dyn PassiveSignal>,
    pub clock: Arc<dyn ClockSource>,
    pub store: Arc<dyn KvStore>,
    pub perf: Arc<dyn PerfSink>,
    /// Needed only for live collections.
    pub realtime: Option<Arc<dyn Realtime>>,
}

impl RuntimeDeps {
    /// Production collaborators for `config`.
    ///
    /// With no host connectivity hook available the passive signal starts
    /// online and never changes; probes alone decide the state.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = match &config.cache.path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let realtime = config
            .realtime
            .url
            .as_ref()
            .map(|url| Arc::new(WebSocketFeed::new(url.as_str())) as Arc<dyn Realtime>);

        Ok(RuntimeDeps {
            probe: Arc::new(TcpProbe::new(config.connectivity.probe_addr.as_str())),
            signal: Arc::new(ManualSignal::new(true)),
            clock: Arc::new(SystemClock),
            store,
            perf: Arc::new(TracingSink),
            realtime,
        })
    }
}

/// Shared state behind one application session.
pub struct Runtime {
    config: Config,
    cache: CacheStore,
    monitor: ConnectivityMonitor,
    notifier: Notifier,
    data: DataAccess,
    realtime: Option<Arc<dyn Realtime>>,
    /// Parent of every session token.
    lifetime: CancellationToken,
    session: Mutex<CancellationToken>,
}

impl Runtime {
    /// Validates `config`, wires the components and starts the monitor's
    /// background probing. Must be called inside a tokio runtime.
    pub fn init(config: Config, deps: RuntimeDeps) -> Result<Self> {
        config.validate()?;

        let cache = CacheStore::new(deps.store, deps.clock.clone());
        let monitor = ConnectivityMonitor::new(
            deps.probe,
            deps.signal,
            deps.clock,
            MonitorOptions::from(&config.connectivity),
        );
        let notifier = Notifier::new();
        let data = DataAccess::new(cache.clone(), monitor.clone(), deps.perf, notifier.clone());
        let lifetime = CancellationToken::new();
        let session = Mutex::new(lifetime.child_token());

        monitor.start();
        tracing::info!(
            persistent = config.cache.path.is_some(),
            realtime = deps.realtime.is_some(),
            "runtime started"
        );

        Ok(Runtime { config, cache, monitor, notifier, data, realtime: deps.realtime, lifetime, session })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn data(&self) -> &DataAccess {
        &self.data
    }

    /// Read options honouring the configured freshness window.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::default().with_max_age(self.config.cache.max_age())
    }

    /// A fresh coordinator for one operation stream.
    pub fn retry(&self) -> RetryCoordinator {
        RetryCoordinator::new(self.config.retry.policy())
    }

    /// Token cancelled at the next sign-out or shutdown.
    pub fn session(&self) -> CancellationToken {
        self.current_session().clone()
    }

    /// A profile sync engine bound to the current session, already
    /// watching for reconnects.
    pub fn profile_sync(&self, remote: Arc<dyn RemoteCollection<ProfileRecord>>) -> Result<ProfileSync> {
        self.ensure_running()?;
        let sync = ProfileSync::new(
            self.data.clone(),
            remote,
            self.notifier.clone(),
            self.config.retry.policy(),
            self.session(),
        );
        sync.start(&self.monitor);
        Ok(sync)
    }

    /// A live collection bound to the current session. It resyncs after
    /// every reconnect; call [`LiveCollection::subscribe`] to start it.
    pub fn live<R: Record>(
        &self,
        channel: ChannelSpec,
        cache_key: CacheKey,
        remote: Arc<dyn RemoteCollection<R>>,
    ) -> Result<LiveCollection<R>> {
        self.ensure_running()?;
        let realtime = self
            .realtime
            .clone()
            .ok_or_else(|| Error::Config("no realtime feed configured".to_string()))?;
        let live = LiveCollection::new(
            channel,
            cache_key,
            LiveSources { realtime, remote },
            self.data.clone(),
            self.notifier.clone(),
            self.session(),
        );
        live.follow(&self.monitor);
        Ok(live)
    }

    /// Ends the session: every subscription and sync task bound to it is
    /// released and the cache is cleared.
    pub fn sign_out(&self) -> Result<()> {
        self.ensure_running()?;
        {
            let mut session = self.current_session();
            session.cancel();
            *session = self.lifetime.child_token();
        }
        self.cache.invalidate_all();
        tracing::info!("signed out, cache cleared");
        Ok(())
    }

    /// Stops every task. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.lifetime.is_cancelled() {
            return;
        }
        self.lifetime.cancel();
        self.monitor.shutdown();
        tracing::info!("runtime shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::ShutDown);
        }
        Ok(())
    }

    fn current_session(&self) -> MutexGuard<'_, CancellationToken> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
