// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Profile sync engine.
//!
//! Keeps one locally editable profile draft in step with the remote
//! record. The draft is pulled when a user identity becomes available,
//! pushed on explicit save, and pushed again after a reconnect if it is
//! still dirty. The dirty flag is cleared only by a confirmed push of the
//! latest edit.
//!
//! A push the remote refuses for any reason other than the network marks
//! the draft rejected. Rejected drafts are not pushed on reconnect; the
//! next edit or an explicit save tries again.
//!
//! The engine is bound to its session. Once the session token is
//! cancelled the in-memory draft is dropped and nothing more is written.
//!
//! Conflict policy: the last local write wins. A push replaces the remote
//! record without merging concurrent remote edits.

use std::sync::{Arc, Mutex, MutexGuard};

use dl_core::{CacheKey, ErrorKind, ProfileRecord, Record, RemoteError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::connectivity::{ConnectivityMonitor, ReconnectWatch};
use crate::facade::{DataAccess, DataError, ReadOptions};
use crate::notify::{Notice, Notifier};
use crate::remote::{Filter, RemoteCollection};
use crate::retry::{RetryCoordinator, RetryPolicy};

const TOPIC: &str = "profile";

/// Local profile state, persisted under `draft_<user>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub record: ProfileRecord,
    /// Local edits not yet confirmed by the remote.
    #[serde(default)]
    pub dirty: bool,
    /// Why the remote refused the last push, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<ErrorKind>,
}

impl ProfileDraft {
    fn clean(record: ProfileRecord) -> Self {
        ProfileDraft { record, dirty: false, rejected: None }
    }

    /// Dirty and not refused by the remote.
    pub fn awaits_push(&self) -> bool {
        self.dirty && self.rejected.is_none()
    }
}

#[derive(Default)]
struct SyncState {
    user: Option<String>,
    draft: Option<ProfileDraft>,
    /// Bumped on every local edit; a push only clears `dirty` if no edit
    /// landed while it was in flight.
    generation: u64,
}

struct Inner {
    data: DataAccess,
    remote: Arc<dyn RemoteCollection<ProfileRecord>>,
    notifier: Notifier,
    policy: RetryPolicy,
    session: CancellationToken,
    state: Mutex<SyncState>,
    push_lock: tokio::sync::Mutex<()>,
}

/// Sole writer of the remote profile record.
#[derive(Clone)]
pub struct ProfileSync {
    inner: Arc<Inner>,
}

impl ProfileSync {
    pub fn new(
        data: DataAccess,
        remote: Arc<dyn RemoteCollection<ProfileRecord>>,
        notifier: Notifier,
        policy: RetryPolicy,
        session: CancellationToken,
    ) -> Self {
        ProfileSync {
            inner: Arc::new(Inner {
                data,
                remote,
                notifier,
                policy,
                session,
                state: Mutex::new(SyncState::default()),
                push_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn user(&self) -> Option<String> {
        self.inner.state().user.clone()
    }

    pub fn draft(&self) -> Option<ProfileDraft> {
        self.inner.state().draft.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state().draft.as_ref().is_some_and(|d| d.dirty)
    }

    fn awaits_push(&self) -> bool {
        self.inner.state().draft.as_ref().is_some_and(ProfileDraft::awaits_push)
    }

    /// Loads the profile for `user_id`.
    ///
    /// A dirty draft persisted from an earlier session is kept as is;
    /// otherwise the pulled record becomes the clean draft. If the pull
    /// fails the persisted draft (if any) is still installed.
    pub async fn on_identity(&self, user_id: &str) -> Result<ProfileDraft, DataError> {
        if self.inner.ended() {
            return Err(session_ended());
        }
        let persisted: Option<ProfileDraft> = self.inner.data.cache().get_stale(&CacheKey::draft(user_id));

        let remote = self.inner.remote.clone();
        let filter = Filter::eq("id", user_id);
        let missing = format!("profile {} not found", user_id);
        let outcome = self
            .inner
            .data
            .read("fetch_profile", &CacheKey::profile(user_id), ReadOptions::refresh(), || async move {
                remote.fetch(&filter).await.and_then(|rows| {
                    rows.into_iter().next().ok_or_else(|| RemoteError::new(missing).with_status(404))
                })
            })
            .await;

        let mut state = self.inner.state();
        if self.inner.ended() {
            return Err(session_ended());
        }
        state.user = Some(user_id.to_string());
        state.generation += 1;
        state.draft = match (outcome.data, persisted) {
            (_, Some(local)) if local.dirty => {
                tracing::info!(user = user_id, "keeping unsynced local profile edits");
                Some(local)
            }
            (Some(record), _) => {
                let draft = ProfileDraft::clean(record);
                self.inner.persist(user_id, &draft);
                Some(draft)
            }
            (None, local) => local,
        };

        match (&state.draft, outcome.error) {
            (Some(draft), _) => Ok(draft.clone()),
            (None, Some(err)) => Err(err),
            (None, None) => Err(DataError::new(ErrorKind::NotFound, "no profile")),
        }
    }

    /// Applies a local edit and marks the draft dirty. Nothing is pushed.
    pub fn edit(&self, change: impl FnOnce(&mut ProfileRecord)) -> Result<(), DataError> {
        let mut state = self.inner.state();
        if self.inner.ended() {
            return Err(session_ended());
        }
        let user = state.user.clone().ok_or_else(no_profile)?;
        let draft = state.draft.as_mut().ok_or_else(no_profile)?;
        change(&mut draft.record);
        draft.dirty = true;
        draft.rejected = None;
        self.inner.persist(&user, draft);
        state.generation += 1;
        Ok(())
    }

    /// Replaces the whole draft with `record` and marks it dirty.
    pub fn replace_draft(&self, record: ProfileRecord) -> Result<(), DataError> {
        self.edit(|draft| *draft = record)
    }

    /// Pushes the draft now, whatever the connectivity. On a network
    /// failure the draft stays dirty and is retried after the next
    /// reconnect; any other failure leaves it rejected.
    pub async fn save(&self) -> Result<ProfileRecord, DataError> {
        self.push(None).await
    }

    /// Forgets the in-memory draft. Persisted drafts are left to the
    /// cache's own lifecycle.
    pub fn clear(&self) {
        self.inner.state().reset();
    }

    /// Pushes a dirty draft after every reconnect until the session ends.
    ///
    /// Transient failures are retried with backoff; crossing the retry
    /// ceiling publishes one warning notice and leaves the draft dirty.
    /// Rejected drafts are skipped.
    pub fn start(&self, monitor: &ConnectivityMonitor) {
        let sync = self.clone();
        let mut transitions = monitor.subscribe();
        let mut watch = ReconnectWatch::new(monitor.current_state());
        let session = self.inner.session.clone();

        tokio::spawn(async move {
            loop {
                let transition = tokio::select! {
                    _ = session.cancelled() => {
                        sync.clear();
                        return;
                    }
                    event = transitions.recv() => match event {
                        Ok(transition) => transition,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    },
                };
                if !watch.observe(&transition) || !sync.awaits_push() {
                    continue;
                }
                tracing::info!("reconnected, pushing local profile edits");
                let mut retry = RetryCoordinator::new(sync.inner.policy);
                if let Err(e) = sync.push(Some(&mut retry)).await {
                    tracing::warn!("profile push after reconnect failed: {}", e);
                }
            }
        });
    }

    async fn push(&self, retry: Option<&mut RetryCoordinator>) -> Result<ProfileRecord, DataError> {
        let _pushing = self.inner.push_lock.lock().await;
        let (record, generation) = {
            let state = self.inner.state();
            let draft = state.draft.as_ref().ok_or_else(no_profile)?;
            (draft.record.clone(), state.generation)
        };

        let result = match retry {
            Some(retry) => {
                let monitor = self.inner.data.monitor();
                retry
                    .run(
                        || self.upsert(&record),
                        |err: &DataError| err.kind.is_retryable() && monitor.believes_online(),
                    )
                    .await
                    .map_err(|failure| {
                        if failure.exhausted {
                            self.inner.notifier.notify(Notice::warning(
                                TOPIC,
                                format!("profile changes not saved after {} retries", failure.attempts),
                            ));
                        }
                        failure.error
                    })
            }
            None => self.upsert(&record).await,
        };

        self.settle(generation, &result);
        result
    }

    /// The stored record is cached by `settle`, once the session is known
    /// to be alive.
    async fn upsert(&self, record: &ProfileRecord) -> Result<ProfileRecord, DataError> {
        let remote = &self.inner.remote;
        self.inner
            .data
            .write_validated("push_profile", record, None, || remote.upsert(record))
            .await
            .into_result()
    }

    fn settle(&self, generation: u64, result: &Result<ProfileRecord, DataError>) {
        let mut state = self.inner.state();
        if self.inner.ended() {
            tracing::debug!("session ended during push, dropping result");
            return;
        }
        let current = state.generation;
        let Some(user) = state.user.clone() else {
            return;
        };
        if let Ok(stored) = result {
            self.inner.data.cache().save(&CacheKey::profile(stored.id()), stored);
        }
        let Some(draft) = state.draft.as_mut() else {
            return;
        };
        match result {
            Ok(stored) if current == generation => {
                *draft = ProfileDraft::clean(stored.clone());
                tracing::info!(user = %user, "profile pushed");
            }
            Ok(_) => tracing::debug!(user = %user, "profile edited during push, staying dirty"),
            Err(e) if e.kind.is_retryable() => {
                draft.dirty = true;
                draft.rejected = None;
                tracing::debug!(user = %user, "profile push failed, queued: {}", e);
            }
            Err(e) => {
                draft.dirty = true;
                // A newer edit gets its own chance.
                draft.rejected = (current == generation).then_some(e.kind);
                tracing::warn!(user = %user, kind = ?e.kind, "profile push rejected: {}", e);
                self.inner
                    .notifier
                    .notify(Notice::error(TOPIC, format!("profile changes rejected: {}", e.kind.user_message())));
            }
        }
        self.inner.persist(&user, draft);
    }
}

impl SyncState {
    fn reset(&mut self) {
        self.user = None;
        self.draft = None;
        self.generation += 1;
    }
}

impl Inner {
    /// Locks the state, dropping it first if the session has ended.
    fn state(&self) -> MutexGuard<'_, SyncState> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if self.ended() && state.user.is_some() {
            state.reset();
        }
        state
    }

    fn ended(&self) -> bool {
        self.session.is_cancelled()
    }

    fn persist(&self, user: &str, draft: &ProfileDraft) {
        if self.ended() {
            return;
        }
        self.data.cache().save(&CacheKey::draft(user), draft);
    }
}

fn no_profile() -> DataError {
    DataError::new(ErrorKind::Generic, "no profile loaded")
}

fn session_ended() -> DataError {
    DataError::new(ErrorKind::Auth, "session ended")
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
