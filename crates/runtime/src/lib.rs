// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! driftless: a data-resilience runtime for apps that must keep working
//! on a flaky network.
//!
//! ```text
//!            ┌──────────────────────────── Runtime ─────────────────────────────┐
//!  caller ──►│ DataAccess ──► CacheStore ──► KvStore (memory / sqlite)           │
//!            │     │    └───► RemoteCollection (boundary)                        │
//!            │     └──────► ConnectivityMonitor ◄── Probe + PassiveSignal       │
//!            │ LiveCollection ◄── Realtime feed          ProfileSync ──► remote │
//!            │     └──► Notifier ◄────────────────────────────┘                 │
//!            └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads are cache-aside with a freshness window and fall back to stale
//! cache when the network is down. Live collections apply ordered change
//! events. The profile sync engine pushes local edits after a reconnect.

pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod facade;
pub mod logging;
pub mod notify;
pub mod perf;
pub mod profile;
pub mod realtime;
pub mod remote;
pub mod retry;
pub mod runtime;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use cache::{CacheEntry, CacheStore};
pub use config::Config;
pub use connectivity::{ConnectivityMonitor, ConnectivityState, Transition};
pub use error::{Error, Result};
pub use facade::{DataAccess, DataError, ReadOptions, ReadOutcome, WriteOutcome};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use perf::{MemorySink, PerfSample, PerfSink, TracingSink};
pub use profile::{ProfileDraft, ProfileSync};
pub use realtime::{ChannelState, LiveCollection, LiveSources, WebSocketFeed};
pub use remote::{ChannelSpec, Filter, Realtime, RemoteCollection, RemoteFuture, Subscription};
pub use retry::{RetryCoordinator, RetryPolicy, RetryState};
pub use runtime::{Runtime, RuntimeDeps};
pub use store::{KvStore, MemoryStore, SqliteStore};
