// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Change events published by the remote service.
//!
//! Events arrive per channel (one channel per entity collection) with a
//! sequence number that increases monotonically within the channel. The
//! sequence, not wall-clock time, decides which of two writes is newer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single remote change.
///
/// `payload` is the remote row as JSON: the full record for inserts, the
/// changed fields (or full record) for updates, and `null` for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub entity_id: String,
    #[serde(default)]
    pub payload: Option<Value>,
    pub sequence: u64,
}

impl ChangeEvent {
    pub fn insert(entity_id: impl Into<String>, payload: Value, sequence: u64) -> Self {
        ChangeEvent { kind: ChangeKind::Insert, entity_id: entity_id.into(), payload: Some(payload), sequence }
    }

    pub fn update(entity_id: impl Into<String>, payload: Value, sequence: u64) -> Self {
        ChangeEvent { kind: ChangeKind::Update, entity_id: entity_id.into(), payload: Some(payload), sequence }
    }

    pub fn delete(entity_id: impl Into<String>, sequence: u64) -> Self {
        ChangeEvent { kind: ChangeKind::Delete, entity_id: entity_id.into(), payload: None, sequence }
    }

    /// Parses an event from a JSON text frame.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
