// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for event reconciliation.

#![allow(clippy::unwrap_used)]

use super::reconciler::{Applied, EntityCollection, IgnoreReason};
use dl_core::{ChangeEvent, ChatMessage};
use serde_json::json;

fn message(id: &str, body: &str) -> serde_json::Value {
    json!({"id": id, "match_id": "m1", "sender_id": "u1", "body": body, "read": false})
}

fn apply_all(events: &[ChangeEvent]) -> (EntityCollection<ChatMessage>, Vec<Applied>) {
    let mut collection = EntityCollection::new();
    let applied = events.iter().map(|e| collection.apply(e).unwrap()).collect();
    (collection, applied)
}

fn bodies(collection: &EntityCollection<ChatMessage>) -> Vec<(&str, &str)> {
    collection.items().iter().map(|m| (m.id.as_str(), m.body.as_str())).collect()
}

#[test]
fn insert_update_delete_leaves_nothing() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::insert("a", message("a", "v1"), 1),
        ChangeEvent::update("a", json!({"body": "v2"}), 2),
        ChangeEvent::delete("a", 3),
    ]);

    assert!(collection.is_empty());
    assert_eq!(
        applied,
        vec![
            Applied::Inserted("a".into()),
            Applied::Updated("a".into()),
            Applied::Deleted("a".into())
        ]
    );
}

#[test]
fn insert_after_newer_update_does_not_overwrite() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::update("a", message("a", "latest"), 5),
        ChangeEvent::insert("a", message("a", "original"), 4),
    ]);

    assert_eq!(bodies(&collection), vec![("a", "latest")]);
    assert_eq!(applied[0], Applied::Inserted("a".into()));
    assert_eq!(applied[1], Applied::Ignored(IgnoreReason::Stale { sequence: 4, last_applied: 5 }));
}

#[test]
fn duplicate_insert_is_suppressed() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::insert("a", message("a", "first"), 1),
        ChangeEvent::insert("a", message("a", "second"), 2),
    ]);

    assert_eq!(bodies(&collection), vec![("a", "first")]);
    assert_eq!(applied[1], Applied::Ignored(IgnoreReason::Duplicate));
    assert!(!applied[1].changed());
}

#[test]
fn update_patches_only_given_fields() {
    let (collection, _) = apply_all(&[
        ChangeEvent::insert("a", message("a", "hello"), 1),
        ChangeEvent::update("a", json!({"read": true}), 2),
    ]);

    let msg = collection.get("a").unwrap();
    assert!(msg.read);
    assert_eq!(msg.body, "hello");
    assert_eq!(msg.sender_id, "u1");
}

#[test]
fn stale_update_is_ignored() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::insert("a", message("a", "v1"), 3),
        ChangeEvent::update("a", json!({"body": "old"}), 2),
        ChangeEvent::update("a", json!({"body": "same-seq"}), 3),
    ]);

    assert_eq!(bodies(&collection), vec![("a", "v1")]);
    assert!(matches!(applied[1], Applied::Ignored(IgnoreReason::Stale { .. })));
    assert!(matches!(applied[2], Applied::Ignored(IgnoreReason::Stale { .. })));
}

#[test]
fn delete_of_absent_id_is_noop_and_blocks_late_insert() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::delete("a", 7),
        ChangeEvent::insert("a", message("a", "zombie"), 6),
    ]);

    assert!(collection.is_empty());
    assert_eq!(applied[0], Applied::Ignored(IgnoreReason::Missing));
    assert!(matches!(applied[1], Applied::Ignored(IgnoreReason::Stale { .. })));
}

#[test]
fn insertion_order_is_kept() {
    let (collection, _) = apply_all(&[
        ChangeEvent::insert("c", message("c", "3"), 1),
        ChangeEvent::insert("a", message("a", "1"), 1),
        ChangeEvent::insert("b", message("b", "2"), 1),
        ChangeEvent::update("c", json!({"body": "3'"}), 2),
    ]);

    assert_eq!(bodies(&collection), vec![("c", "3'"), ("a", "1"), ("b", "2")]);
}

#[test]
fn missing_payload_is_an_error_and_changes_nothing() {
    let mut collection = EntityCollection::<ChatMessage>::new();
    let event = ChangeEvent { payload: None, ..ChangeEvent::insert("a", json!({}), 1) };

    assert!(collection.apply(&event).is_err());
    assert!(collection.is_empty());

    // The failed event did not consume its sequence.
    collection.apply(&ChangeEvent::insert("a", message("a", "ok"), 1)).unwrap();
    assert!(collection.contains("a"));
}

#[test]
fn unmappable_payload_is_an_error() {
    let mut collection = EntityCollection::<ChatMessage>::new();
    let event = ChangeEvent::insert("a", json!({"id": "a", "read": "not a bool"}), 1);
    assert!(collection.apply(&event).is_err());
    assert!(collection.is_empty());
}

#[test]
fn refetch_replaces_items_but_keeps_history() {
    let mut collection = EntityCollection::<ChatMessage>::new();
    collection.apply(&ChangeEvent::insert("a", message("a", "v1"), 4)).unwrap();

    let fetched: ChatMessage = serde_json::from_value(message("a", "fetched")).unwrap();
    collection.replace_all(vec![fetched]);
    assert_eq!(bodies(&collection), vec![("a", "fetched")]);

    let late = collection.apply(&ChangeEvent::update("a", json!({"body": "late"}), 3)).unwrap();
    assert!(matches!(late, Applied::Ignored(IgnoreReason::Stale { .. })));

    collection.clear();
    assert!(collection.is_empty());
}

#[test]
fn partial_update_before_insert_is_applied_on_top() {
    let (collection, applied) = apply_all(&[
        ChangeEvent::update("a", json!({"body": "edited"}), 5),
        ChangeEvent::insert("a", message("a", "original"), 4),
    ]);

    assert_eq!(applied[0], Applied::Ignored(IgnoreReason::Pending));
    assert_eq!(applied[1], Applied::Inserted("a".into()));
    assert_eq!(bodies(&collection), vec![("a", "edited")]);
    assert_eq!(collection.get("a").unwrap().sender_id, "u1");
}

#[test]
fn pending_update_older_than_insert_is_dropped() {
    let (collection, _) = apply_all(&[
        ChangeEvent::update("a", json!({"body": "old edit"}), 2),
        ChangeEvent::insert("a", message("a", "current"), 3),
    ]);

    assert_eq!(bodies(&collection), vec![("a", "current")]);
}

#[test]
fn pending_update_does_not_block_later_events() {
    let mut collection = EntityCollection::<ChatMessage>::new();
    collection.apply(&ChangeEvent::update("a", json!({"body": "edited"}), 5)).unwrap();
    collection.apply(&ChangeEvent::insert("a", message("a", "original"), 4)).unwrap();

    let later = collection.apply(&ChangeEvent::update("a", json!({"read": true}), 6)).unwrap();

    assert_eq!(later, Applied::Updated("a".into()));
    let held = collection.get("a").unwrap();
    assert_eq!(held.body, "edited");
    assert!(held.read);
}

#[test]
fn delete_discards_a_pending_update() {
    let (collection, _) = apply_all(&[
        ChangeEvent::update("a", json!({"body": "edited"}), 2),
        ChangeEvent::delete("a", 3),
    ]);

    assert!(collection.is_empty());
}

#[test]
fn insert_without_id_takes_the_entity_id() {
    let (collection, applied) =
        apply_all(&[ChangeEvent::insert("a", json!({"match_id": "m1", "body": "hi"}), 1)]);

    assert_eq!(applied, vec![Applied::Inserted("a".into())]);
    assert_eq!(bodies(&collection), vec![("a", "hi")]);
}

#[yare::parameterized(
    insert = { ChangeEvent::insert("a", message("b", "wrong"), 1) },
    full_update = { ChangeEvent::update("a", message("b", "wrong"), 1) },
    numeric_id = { ChangeEvent::insert("a", json!({"id": 7, "body": "wrong"}), 1) },
)]
fn payload_naming_another_entity_is_an_error(event: ChangeEvent) {
    let mut collection = EntityCollection::<ChatMessage>::new();

    assert!(collection.apply(&event).is_err());
    assert!(collection.is_empty());
}

#[test]
fn mismatched_ids_never_duplicate_records() {
    let mut collection = EntityCollection::<ChatMessage>::new();
    collection.apply(&ChangeEvent::insert("a", message("a", "first"), 1)).unwrap();

    assert!(collection.apply(&ChangeEvent::insert("a", message("b", "again"), 2)).is_err());
    assert!(collection.apply(&ChangeEvent::update("a", message("b", "patched"), 3)).is_err());
    assert!(collection.apply(&ChangeEvent::insert("b", message("b", "own"), 4)).is_ok());

    assert_eq!(bodies(&collection), vec![("a", "first"), ("b", "own")]);
}
