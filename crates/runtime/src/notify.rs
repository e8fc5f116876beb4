// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! User-visible notices.
//!
//! The runtime never renders anything. It publishes [`Notice`]s and the
//! host decides how to show them (toast, badge, log line).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    /// Short machine-friendly origin, e.g. `appointment` or `profile_sync`.
    pub topic: String,
    pub message: String,
}

impl Notice {
    pub fn info(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Info, topic: topic.into(), message: message.into() }
    }

    pub fn warning(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Warning, topic: topic.into(), message: message.into() }
    }

    pub fn error(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Error, topic: topic.into(), message: message.into() }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.topic, self.message)
    }
}

/// Fan-out of notices to every subscriber.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(128);
        Notifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publishes a notice. With no subscribers it is only logged.
    pub fn notify(&self, notice: Notice) {
        tracing::debug!(topic = %notice.topic, "notice: {}", notice.message);
        let _ = self.tx.send(notice);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
