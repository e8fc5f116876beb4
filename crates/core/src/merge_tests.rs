// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::{AppointmentRecord, AppointmentStatus, ChatMessage};
use serde_json::json;
use yare::parameterized;

#[parameterized(
    adds_field = { json!({"a": 1}), json!({"b": 2}), json!({"a": 1, "b": 2}) },
    replaces_field = { json!({"a": 1, "b": 2}), json!({"b": 3}), json!({"a": 1, "b": 3}) },
    empty_patch = { json!({"a": 1}), json!({}), json!({"a": 1}) },
    nested_replaced_whole = { json!({"o": {"x": 1, "y": 2}}), json!({"o": {"x": 5}}), json!({"o": {"x": 5}}) },
    scalar_replaces = { json!({"a": 1}), json!(7), json!(7) },
    object_over_null = { json!(null), json!({"a": 1}), json!({"a": 1}) },
)]
fn merge_fields_cases(base: Value, patch: Value, expected: Value) {
    let mut base = base;
    merge_fields(&mut base, &patch);
    assert_eq!(base, expected);
}

#[test]
fn patch_record_keeps_untouched_fields() {
    let appt = AppointmentRecord {
        id: "a1".into(),
        consumer_id: "c1".into(),
        advisor_id: "v1".into(),
        duration_minutes: 30,
        notes: Some("bring statements".into()),
        ..Default::default()
    };

    let patched = patch_record(&appt, &json!({"status": "confirmed"})).unwrap();

    assert_eq!(patched.status, AppointmentStatus::Confirmed);
    assert_eq!(patched.duration_minutes, 30);
    assert_eq!(patched.notes.as_deref(), Some("bring statements"));
}

#[test]
fn patch_record_rejects_bad_shape() {
    let msg = ChatMessage { id: "m1".into(), ..Default::default() };
    let err = patch_record(&msg, &json!({"read": "yes"})).unwrap_err();
    assert!(matches!(err, Error::Mapping { tag: "chat_message", .. }));
}

#[test]
fn map_record_fills_defaults() {
    let msg: ChatMessage = map_record(&json!({"id": "m1", "body": "hi"})).unwrap();
    assert_eq!(msg.body, "hi");
    assert!(!msg.read);
}
