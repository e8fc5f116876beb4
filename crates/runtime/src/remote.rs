// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote data boundary.
//!
//! The remote service is a black box reached through request/response
//! calls ([`RemoteCollection`]) and a publish/subscribe primitive
//! ([`Realtime`]). Failures come back as [`RemoteError`] and are classified
//! by the caller.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use dl_core::{Record, RemoteError, TypeTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Future returned by remote boundary calls.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// Equality filter over top-level record fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub eq: Vec<(String, String)>,
}

impl Filter {
    /// Matches every record.
    pub fn all() -> Self {
        Filter::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((field.into(), value.into()));
        self
    }

    /// Whether a JSON row satisfies every clause. Non-string fields are
    /// compared by their JSON rendering.
    pub fn matches(&self, row: &Value) -> bool {
        self.eq.iter().all(|(field, expected)| match row.get(field) {
            Some(Value::String(actual)) => actual == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> =
            self.eq.iter().map(|(field, value)| format!("{}=eq.{}", field, value)).collect();
        write!(f, "{}", clauses.join("&"))
    }
}

/// Request/response access to one remote collection.
pub trait RemoteCollection<R: Record>: Send + Sync {
    fn fetch(&self, filter: &Filter) -> RemoteFuture<'_, Vec<R>>;

    /// Inserts or replaces `record`, returning the stored version.
    fn upsert(&self, record: &R) -> RemoteFuture<'_, R>;
}

/// A logical change feed: one entity collection, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub tag: TypeTag,
    #[serde(default)]
    pub filter: Filter,
}

impl ChannelSpec {
    pub fn new(tag: TypeTag, filter: Filter) -> Self {
        let name = if filter.eq.is_empty() {
            format!("{}_changes", tag)
        } else {
            format!("{}_changes:{}", tag, filter)
        };
        ChannelSpec { name, tag, filter }
    }
}

/// A live feed of change events.
///
/// Events arrive in delivery order. Cancelling the token (or dropping the
/// subscription) releases the channel on the remote side.
#[derive(Debug)]
pub struct Subscription {
    pub events: mpsc::Receiver<dl_core::ChangeEvent>,
    pub cancel: CancellationToken,
}

impl Subscription {
    pub fn new(events: mpsc::Receiver<dl_core::ChangeEvent>, cancel: CancellationToken) -> Self {
        Subscription { events, cancel }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Publish/subscribe access to change feeds.
pub trait Realtime: Send + Sync {
    fn subscribe(&self, channel: &ChannelSpec) -> RemoteFuture<'_, Subscription>;
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
