// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The connectivity monitor.
//!
//! State lives in atomics so every component can read it without locking.
//! Only the monitor writes it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dl_core::ClockSource;
use tokio::sync::{broadcast, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{ConnectivityState, PassiveSignal, Probe, Transition};
use crate::config::ConnectivityConfig;

/// Timing knobs for the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Hard bound on a single probe. A probe past it counts as offline.
    pub probe_timeout: Duration,
    /// Background re-probe interval.
    pub interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions { probe_timeout: Duration::from_secs(3), interval: Duration::from_secs(30) }
    }
}

impl From<&ConnectivityConfig> for MonitorOptions {
    fn from(config: &ConnectivityConfig) -> Self {
        MonitorOptions { probe_timeout: config.probe_timeout(), interval: config.interval() }
    }
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub state: ConnectivityState,
    /// When the last probe settled, if one ever did.
    pub last_checked_at: Option<u64>,
}

type Waiters = Vec<oneshot::Sender<bool>>;

struct Inner {
    state: AtomicU8,
    last_checked_at: AtomicU64,
    probe: Arc<dyn Probe>,
    signal: Arc<dyn PassiveSignal>,
    clock: Arc<dyn ClockSource>,
    options: MonitorOptions,
    transitions: broadcast::Sender<Transition>,
    /// `Some` while a probe is in flight; holds callers waiting on it.
    in_flight: Mutex<Option<Waiters>>,
    started: AtomicBool,
    cancel: CancellationToken,
}

/// Tracks online/offline/checking state from passive signals and probes.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Creates a monitor whose initial state mirrors the passive signal.
    ///
    /// No probe runs until [`force_check`](Self::force_check) or
    /// [`start`](Self::start) is called.
    pub fn new(
        probe: Arc<dyn Probe>,
        signal: Arc<dyn PassiveSignal>,
        clock: Arc<dyn ClockSource>,
        options: MonitorOptions,
    ) -> Self {
        let initial = if signal.is_online() {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };
        let (transitions, _) = broadcast::channel(64);
        ConnectivityMonitor {
            inner: Arc::new(Inner {
                state: AtomicU8::new(initial.to_u8()),
                last_checked_at: AtomicU64::new(0),
                probe,
                signal,
                clock,
                options,
                transitions,
                in_flight: Mutex::new(None),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn current_state(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        let last = self.inner.last_checked_at.load(Ordering::Acquire);
        ConnectivitySnapshot {
            state: self.current_state(),
            last_checked_at: (last != 0).then_some(last),
        }
    }

    /// True unless the monitor or the passive signal says offline.
    pub fn believes_online(&self) -> bool {
        self.current_state() != ConnectivityState::Offline && self.inner.signal.is_online()
    }

    /// Receives every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.inner.transitions.subscribe()
    }

    /// Runs `callback` for each transition until the returned token is
    /// cancelled or the monitor shuts down.
    pub fn on_transition<F>(&self, callback: F) -> CancellationToken
    where
        F: Fn(Transition) + Send + 'static,
    {
        let token = self.inner.cancel.child_token();
        let stop = token.clone();
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => return,
                    event = rx.recv() => match event {
                        Ok(transition) => callback(transition),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("transition callback lagged by {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        });
        token
    }

    /// Probes now and returns whether the network is reachable.
    ///
    /// When the passive signal already says offline the probe is skipped.
    /// If a probe is already in flight, this waits for its result instead
    /// of starting another one.
    pub async fn force_check(&self) -> bool {
        if !self.inner.signal.is_online() {
            self.mark_offline();
            return false;
        }

        let waiter = {
            let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    *in_flight = Some(Vec::new());
                    None
                }
            }
        };
        if let Some(rx) = waiter {
            return rx.await.unwrap_or(false);
        }

        let mut flight = Flight { monitor: self, outcome: None };
        self.set_state(ConnectivityState::Checking);

        let online = match tokio::time::timeout(self.inner.options.probe_timeout, self.inner.probe.probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("connectivity probe failed: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!("connectivity probe timed out after {:?}", self.inner.options.probe_timeout);
                false
            }
        };

        flight.outcome = Some(online);
        drop(flight);
        online
    }

    /// Records that the host reported going offline. No probe is run.
    pub fn mark_offline(&self) {
        self.set_state(ConnectivityState::Offline);
    }

    /// Starts the background loop: an immediate probe, one per interval,
    /// and one whenever the passive signal reports coming back online.
    ///
    /// Calling this more than once has no effect.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run().await });
    }

    /// Stops the background loop and any callback tasks.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    async fn run(self) {
        let cancel = self.inner.cancel.clone();
        let mut ticker = tokio::time::interval(self.inner.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passive = self.inner.signal.subscribe();
        let mut passive_open = true;

        tracing::debug!(interval = ?self.inner.options.interval, "connectivity monitor started");

        loop {
            let probe_now = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => true,
                event = passive.recv(), if passive_open => match event {
                    Ok(true) => true,
                    Ok(false) => {
                        self.mark_offline();
                        false
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => true,
                    Err(broadcast::error::RecvError::Closed) => {
                        passive_open = false;
                        false
                    }
                },
            };

            if probe_now {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.force_check() => {}
                }
            }
        }

        tracing::debug!("connectivity monitor stopped");
    }

    fn set_state(&self, to: ConnectivityState) {
        let from = ConnectivityState::from_u8(self.inner.state.swap(to.to_u8(), Ordering::AcqRel));
        if from == to {
            return;
        }
        let transition = Transition { from, to, at_ms: self.inner.clock.now_ms() };
        if to == ConnectivityState::Checking {
            tracing::debug!("connectivity {} -> {}", from, to);
        } else {
            tracing::info!("connectivity {} -> {}", from, to);
        }
        let _ = self.inner.transitions.send(transition);
    }
}

/// Settles an in-flight probe, even if the probing future is dropped.
struct Flight<'a> {
    monitor: &'a ConnectivityMonitor,
    outcome: Option<bool>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        let online = self.outcome.unwrap_or(false);
        let inner = &self.monitor.inner;
        inner.last_checked_at.store(inner.clock.now_ms().max(1), Ordering::Release);
        self.monitor.set_state(if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        });

        let waiters = inner.in_flight.lock().unwrap_or_else(|e| e.into_inner()).take();
        for waiter in waiters.into_iter().flatten() {
            let _ = waiter.send(online);
        }
    }
}

/// Detects genuine reconnects in a transition stream.
///
/// Periodic probes produce `Online -> Checking -> Online`, which is not a
/// reconnect. This remembers the last settled state across `Checking` and
/// reports only `Offline -> Online`.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectWatch {
    last_settled: ConnectivityState,
}

impl ReconnectWatch {
    /// Starts from the monitor's current state. An initial `Checking`
    /// counts as offline.
    pub fn new(initial: ConnectivityState) -> Self {
        let last_settled = match initial {
            ConnectivityState::Online => ConnectivityState::Online,
            _ => ConnectivityState::Offline,
        };
        ReconnectWatch { last_settled }
    }

    /// Feeds one transition; returns true when it completes a reconnect.
    pub fn observe(&mut self, transition: &Transition) -> bool {
        match transition.to {
            ConnectivityState::Checking => false,
            settled => {
                let reconnected = settled == ConnectivityState::Online
                    && self.last_settled == ConnectivityState::Offline;
                self.last_settled = settled;
                reconnected
            }
        }
    }
}
