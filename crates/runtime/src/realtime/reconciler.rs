// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merging change events into an in-memory collection.
//!
//! Rules, applied per entity id:
//! - An event whose sequence is not newer than the last one applied for
//!   that id is stale and ignored
//! - Insert appends only when the id is absent
//! - Update patches the held record field by field. An update for an id
//!   that is not held inserts its payload when that is a full row (it
//!   carries `id`); a partial one is held back and applied on top of the
//!   insert that follows, if it is newer
//! - Delete removes the id; deleting an absent id is a no-op
//!
//! The event's `entity_id` is authoritative: a payload without `id` gets
//! it filled in, a payload naming another id is rejected.
//!
//! Deletes leave their sequence behind, so a late insert cannot bring a
//! deleted entity back.

use std::collections::HashMap;
use std::fmt;

use dl_core::{map_record, merge_fields, patch_record, ChangeEvent, ChangeKind, Error, Record, Result};
use serde_json::Value;

/// Why an event did not change the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// An event with this or a later sequence was already applied.
    Stale { sequence: u64, last_applied: u64 },
    /// Insert for an id that is already held.
    Duplicate,
    /// Delete for an id that is not held.
    Missing,
    /// Partial update for an id that is not held yet; kept for its insert.
    Pending,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::Stale { sequence, last_applied } => {
                write!(f, "stale (sequence {} <= {})", sequence, last_applied)
            }
            IgnoreReason::Duplicate => write!(f, "duplicate insert"),
            IgnoreReason::Missing => write!(f, "already absent"),
            IgnoreReason::Pending => write!(f, "held until insert"),
        }
    }
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Inserted(String),
    Updated(String),
    Deleted(String),
    Ignored(IgnoreReason),
}

impl Applied {
    /// True when the collection changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Applied::Ignored(_))
    }
}

/// Records in insertion order plus the last applied sequence per id.
#[derive(Debug, Clone)]
pub struct EntityCollection<R> {
    items: Vec<R>,
    versions: HashMap<String, u64>,
    /// Partial updates that arrived before their insert, merged, with the
    /// newest sequence among them.
    pending: HashMap<String, (u64, Value)>,
}

impl<R> Default for EntityCollection<R> {
    fn default() -> Self {
        EntityCollection { items: Vec::new(), versions: HashMap::new(), pending: HashMap::new() }
    }
}

impl<R: Record> EntityCollection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.items.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Replaces the contents after a full refetch.
    ///
    /// Sequence history is kept so events older than what was already
    /// applied stay stale.
    pub fn replace_all(&mut self, records: Vec<R>) {
        self.pending.retain(|id, _| !records.iter().any(|r| r.id() == id.as_str()));
        self.items = records;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.versions.clear();
        self.pending.clear();
    }

    /// Applies one event.
    ///
    /// Errors only when a payload cannot be mapped into `R`; the collection
    /// is unchanged in that case.
    pub fn apply(&mut self, event: &ChangeEvent) -> Result<Applied> {
        let id = event.entity_id.as_str();
        if let Some(&last_applied) = self.versions.get(id) {
            if event.sequence <= last_applied {
                return Ok(Applied::Ignored(IgnoreReason::Stale { sequence: event.sequence, last_applied }));
            }
        }

        let applied = match event.kind {
            ChangeKind::Insert => {
                if self.contains(id) {
                    return Ok(Applied::Ignored(IgnoreReason::Duplicate));
                }
                let row = row_for::<R>(event, payload(event)?)?;
                let mut record = map_record::<R>(&row)?;
                let mut sequence = event.sequence;
                if let Some((pending_seq, patch)) = self.pending.get(id) {
                    if *pending_seq > event.sequence {
                        record = patch_record(&record, patch)?;
                        sequence = *pending_seq;
                    }
                }
                self.pending.remove(id);
                self.items.push(record);
                self.versions.insert(id.to_string(), sequence);
                return Ok(Applied::Inserted(id.to_string()));
            }
            ChangeKind::Update => {
                let patch = payload(event)?;
                check_id::<R>(event, patch)?;
                match self.position(id) {
                    Some(index) => {
                        self.items[index] = patch_record(&self.items[index], patch)?;
                        Applied::Updated(id.to_string())
                    }
                    None if patch.get("id").is_some() => {
                        let record = map_record::<R>(patch)?;
                        self.pending.remove(id);
                        self.items.push(record);
                        Applied::Inserted(id.to_string())
                    }
                    None => {
                        self.hold(id, event.sequence, patch);
                        return Ok(Applied::Ignored(IgnoreReason::Pending));
                    }
                }
            }
            ChangeKind::Delete => {
                self.pending.remove(id);
                match self.position(id) {
                    Some(index) => {
                        self.items.remove(index);
                        Applied::Deleted(id.to_string())
                    }
                    None => {
                        self.versions.insert(id.to_string(), event.sequence);
                        return Ok(Applied::Ignored(IgnoreReason::Missing));
                    }
                }
            }
        };

        self.versions.insert(id.to_string(), event.sequence);
        Ok(applied)
    }

    fn hold(&mut self, id: &str, sequence: u64, patch: &Value) {
        let merged = match self.pending.remove(id) {
            Some((held_seq, mut held)) if held_seq <= sequence => {
                merge_fields(&mut held, patch);
                (sequence, held)
            }
            // Older than what is held: its fields lose to the newer ones.
            Some((held_seq, held)) => {
                let mut older = patch.clone();
                merge_fields(&mut older, &held);
                (held_seq, older)
            }
            None => (sequence, patch.clone()),
        };
        self.pending.insert(id.to_string(), merged);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|r| r.id() == id)
    }
}

/// Rejects a payload whose `id` names a different entity.
fn check_id<R: Record>(event: &ChangeEvent, payload: &Value) -> Result<()> {
    match payload.get("id") {
        None => Ok(()),
        Some(Value::String(id)) if *id == event.entity_id => Ok(()),
        Some(other) => Err(Error::Mapping {
            tag: R::TAG.as_str(),
            reason: format!("payload id {} does not match entity '{}'", other, event.entity_id),
        }),
    }
}

/// The insert payload with `id` set to the event's entity id.
fn row_for<R: Record>(event: &ChangeEvent, payload: &Value) -> Result<Value> {
    check_id::<R>(event, payload)?;
    let mut row = payload.clone();
    match &mut row {
        Value::Object(fields) => {
            fields.entry("id").or_insert_with(|| Value::String(event.entity_id.clone()));
            Ok(row)
        }
        _ => Err(Error::Mapping {
            tag: R::TAG.as_str(),
            reason: format!("{} payload for '{}' is not an object", event.kind, event.entity_id),
        }),
    }
}

fn payload(event: &ChangeEvent) -> Result<&Value> {
    event.payload.as_ref().ok_or_else(|| Error::Mapping {
        tag: "change_event",
        reason: format!("{} event for '{}' has no payload", event.kind, event.entity_id),
    })
}
