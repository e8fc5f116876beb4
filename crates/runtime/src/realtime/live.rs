// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A subscribed, self-updating entity collection.
//!
//! Channel state machine:
//!
//! ```text
//! Unsubscribed ──subscribe()──► Subscribing ──ok──► Subscribed
//!      ▲                             │                   │
//!      └────────── error ────────────┘                   │
//!      └──── unsubscribe() / feed closed / session end ──┘
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dl_core::{classify, CacheKey, ChangeEvent, Record};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::reconciler::{Applied, EntityCollection};
use crate::connectivity::{ConnectivityMonitor, ReconnectWatch};
use crate::facade::{DataAccess, DataError, ReadOptions, ReadOutcome};
use crate::notify::{Notice, Notifier};
use crate::remote::{ChannelSpec, Realtime, RemoteCollection, Subscription};

/// Where a channel is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unsubscribed,
    Subscribing,
    Subscribed,
}

impl ChannelState {
    fn to_u8(self) -> u8 {
        match self {
            ChannelState::Unsubscribed => 0,
            ChannelState::Subscribing => 1,
            ChannelState::Subscribed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ChannelState::Subscribing,
            2 => ChannelState::Subscribed,
            _ => ChannelState::Unsubscribed,
        }
    }
}

/// Boundary collaborators a [`LiveCollection`] talks to.
#[derive(Clone)]
pub struct LiveSources<R: Record> {
    pub realtime: Arc<dyn Realtime>,
    pub remote: Arc<dyn RemoteCollection<R>>,
}

struct Inner<R: Record> {
    channel: ChannelSpec,
    cache_key: CacheKey,
    sources: LiveSources<R>,
    data: DataAccess,
    notifier: Notifier,
    collection: Mutex<EntityCollection<R>>,
    state: AtomicU8,
    /// Generation and token of the current subscription, if any.
    current: Mutex<Option<(u64, CancellationToken)>>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
    session: CancellationToken,
}

/// An entity collection kept current by a realtime channel.
///
/// Only the reconciler task and [`refetch`](Self::refetch) mutate the
/// collection; everyone else reads snapshots.
pub struct LiveCollection<R: Record> {
    inner: Arc<Inner<R>>,
}

impl<R: Record> Clone for LiveCollection<R> {
    fn clone(&self) -> Self {
        LiveCollection { inner: Arc::clone(&self.inner) }
    }
}

impl<R: Record> LiveCollection<R> {
    /// `cache_key` addresses the cached copy of the full list used by
    /// [`refetch`](Self::refetch). Cancelling `session` tears the channel
    /// down as if [`unsubscribe`](Self::unsubscribe) had been called.
    pub fn new(
        channel: ChannelSpec,
        cache_key: CacheKey,
        sources: LiveSources<R>,
        data: DataAccess,
        notifier: Notifier,
        session: CancellationToken,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        LiveCollection {
            inner: Arc::new(Inner {
                channel,
                cache_key,
                sources,
                data,
                notifier,
                collection: Mutex::new(EntityCollection::new()),
                state: AtomicU8::new(ChannelState::Unsubscribed.to_u8()),
                current: Mutex::new(None),
                generation: AtomicU64::new(0),
                revision,
                session,
            }),
        }
    }

    pub fn channel(&self) -> &ChannelSpec {
        &self.inner.channel
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.inner.collection().items().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<R> {
        self.inner.collection().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.collection().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.collection().is_empty()
    }

    /// A counter bumped on every change to the collection.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Opens the channel and starts applying its events.
    ///
    /// Does nothing if the channel is already subscribing or subscribed.
    pub async fn subscribe(&self) -> Result<(), DataError> {
        let inner = &self.inner;
        if inner
            .state
            .compare_exchange(
                ChannelState::Unsubscribed.to_u8(),
                ChannelState::Subscribing.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(());
        }
        if inner.session.is_cancelled() {
            inner.set_state(ChannelState::Unsubscribed);
            return Ok(());
        }

        let token = inner.session.child_token();
        let generation = inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *inner.current() = Some((generation, token.clone()));

        let subscription = match inner.sources.realtime.subscribe(&inner.channel).await {
            Ok(subscription) => subscription,
            Err(err) => {
                inner.release(generation, &token);
                let kind = classify(&err, inner.data.monitor().believes_online());
                tracing::warn!(channel = %inner.channel.name, %kind, "subscribe failed: {}", err);
                return Err(DataError::from_remote(&err, kind));
            }
        };

        {
            let current = inner.current();
            let still_current = matches!(current.as_ref(), Some((g, _)) if *g == generation);
            if !still_current || token.is_cancelled() {
                drop(current);
                tracing::debug!(channel = %inner.channel.name, "unsubscribed while subscribing");
                inner.release(generation, &token);
                return Ok(());
            }
            inner.set_state(ChannelState::Subscribed);
        }

        tracing::info!(channel = %inner.channel.name, "subscribed");
        tokio::spawn(consume(Arc::clone(inner), subscription, generation, token));
        Ok(())
    }

    /// Closes the channel. Events not yet applied are dropped.
    ///
    /// Safe to call at any time and any number of times. When this returns
    /// no further event will be applied.
    pub fn unsubscribe(&self) {
        let taken = {
            let mut current = self.inner.current();
            self.inner.set_state(ChannelState::Unsubscribed);
            current.take()
        };
        if let Some((_, token)) = taken {
            token.cancel();
            // Wait out an apply that is already holding the lock.
            drop(self.inner.collection());
            tracing::info!(channel = %self.inner.channel.name, "unsubscribed");
        }
    }

    /// Replaces the collection with a full read through the data facade.
    ///
    /// Offline, this loads whatever the cache holds.
    pub async fn refetch(&self, options: ReadOptions) -> ReadOutcome<Vec<R>> {
        let inner = &self.inner;
        let remote = Arc::clone(&inner.sources.remote);
        let filter = inner.channel.filter.clone();
        let name = format!("fetch_{}", inner.channel.tag);
        let outcome = inner
            .data
            .read(&name, &inner.cache_key, options, || async move { remote.fetch(&filter).await })
            .await;

        if let Some(records) = &outcome.data {
            inner.collection().replace_all(records.clone());
            inner.revision.send_modify(|rev| *rev += 1);
        }
        outcome
    }

    /// Resubscribes and refetches after every reconnect until the session ends.
    pub fn follow(&self, monitor: &ConnectivityMonitor) {
        let live = self.clone();
        let mut transitions = monitor.subscribe();
        let mut watch = ReconnectWatch::new(monitor.current_state());
        let session = self.inner.session.clone();

        tokio::spawn(async move {
            loop {
                let transition = tokio::select! {
                    _ = session.cancelled() => return,
                    event = transitions.recv() => match event {
                        Ok(transition) => transition,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    },
                };
                if !watch.observe(&transition) {
                    continue;
                }
                tracing::info!(channel = %live.inner.channel.name, "reconnected, resyncing");
                if let Err(e) = live.subscribe().await {
                    tracing::warn!(channel = %live.inner.channel.name, "resubscribe failed: {}", e);
                }
                live.refetch(ReadOptions::refresh()).await;
            }
        });
    }
}

impl<R: Record> Inner<R> {
    fn collection(&self) -> MutexGuard<'_, EntityCollection<R>> {
        self.collection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> MutexGuard<'_, Option<(u64, CancellationToken)>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ChannelState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    /// Cancels `token`; if it belongs to the current subscription, the
    /// channel goes back to `Unsubscribed`.
    fn release(&self, generation: u64, token: &CancellationToken) {
        token.cancel();
        let mut current = self.current();
        if matches!(current.as_ref(), Some((g, _)) if *g == generation) {
            *current = None;
            self.set_state(ChannelState::Unsubscribed);
        }
    }

    fn apply(&self, event: &ChangeEvent, token: &CancellationToken) {
        let result = {
            let mut collection = self.collection();
            if token.is_cancelled() {
                return;
            }
            collection.apply(event)
        };

        match result {
            Ok(Applied::Ignored(reason)) => {
                tracing::debug!(channel = %self.channel.name, id = %event.entity_id, "event ignored: {}", reason);
            }
            Ok(applied) => {
                self.revision.send_modify(|rev| *rev += 1);
                let verb = match applied {
                    Applied::Inserted(_) => "added",
                    Applied::Updated(_) => "updated",
                    _ => "removed",
                };
                self.notifier.notify(Notice::info(
                    self.channel.tag.as_str(),
                    format!("{} {} {}", self.channel.tag, event.entity_id, verb),
                ));
            }
            Err(e) => {
                tracing::warn!(channel = %self.channel.name, id = %event.entity_id, "cannot apply event: {}", e);
            }
        }
    }
}

async fn consume<R: Record>(
    inner: Arc<Inner<R>>,
    mut subscription: Subscription,
    generation: u64,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            event = subscription.events.recv() => match event {
                Some(event) => inner.apply(&event, &token),
                None => {
                    tracing::warn!(channel = %inner.channel.name, "change feed closed");
                    break;
                }
            },
        }
    }
    inner.release(generation, &token);
    drop(subscription);
}
