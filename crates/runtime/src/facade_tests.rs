// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::notify::NoticeLevel;
use crate::retry::RetryPolicy;
use crate::test_helpers::FacadeRig;
use dl_core::{ChatMessage, ConsumerProfile};
use serde_json::{json, Value};
use std::cell::Cell;

/// Counts the call and resolves to `result`.
fn remote(calls: &Cell<usize>, result: Result<Value, RemoteError>) -> impl Future<Output = Result<Value, RemoteError>> {
    calls.set(calls.get() + 1);
    async move { result }
}

fn remote_ok(calls: &Cell<usize>, value: Value) -> impl Future<Output = Result<Value, RemoteError>> {
    remote(calls, Ok(value))
}

fn remote_err(calls: &Cell<usize>, err: RemoteError) -> impl Future<Output = Result<Value, RemoteError>> {
    remote(calls, Err(err))
}

#[tokio::test]
async fn fresh_cache_hit_skips_remote() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || remote_ok(&calls, json!({"name": "B"})))
        .await;

    assert_eq!(outcome.data, Some(json!({"name": "A"})));
    assert!(outcome.is_from_cache);
    assert!(outcome.error.is_none());
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn miss_fetches_and_writes_through() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    let calls = Cell::new(0);

    let first = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || remote_ok(&calls, json!({"name": "A"})))
        .await;
    assert_eq!(first, ReadOutcome { data: Some(json!({"name": "A"})), error: None, is_from_cache: false });

    let second = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || remote_ok(&calls, json!({"name": "B"})))
        .await;
    assert_eq!(second.data, Some(json!({"name": "A"})));
    assert!(second.is_from_cache);
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn expired_entry_is_refetched() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));
    rig.net.clock.advance(300_001);
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || remote_ok(&calls, json!({"name": "B"})))
        .await;
    assert_eq!(outcome.data, Some(json!({"name": "B"})));
    assert!(!outcome.is_from_cache);
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn refresh_bypasses_cache_but_writes_through() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::appointments("u1");
    rig.cache.save(&key, &json!(["old"]));
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_appointments", &key, ReadOptions::refresh(), || remote_ok(&calls, json!(["new"])))
        .await;
    assert_eq!(outcome.data, Some(json!(["new"])));
    assert_eq!(rig.cache.get_stale::<Value>(&key), Some(json!(["new"])));
}

#[tokio::test]
async fn offline_serves_cache_without_calling_remote() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));
    rig.net.clock.advance(10_000_000);
    rig.net.go_offline();
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || remote_ok(&calls, json!({"name": "B"})))
        .await;

    assert_eq!(outcome.data, Some(json!({"name": "A"})));
    assert!(outcome.is_from_cache);
    assert!(outcome.is_degraded());
    assert_eq!(outcome.error.unwrap().message, OFFLINE_CACHE_MESSAGE);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn offline_with_fresh_entry_is_a_plain_hit() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));
    rig.net.go_offline();

    let outcome: ReadOutcome<Value> = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || async { Err(RemoteError::transport("unused")) })
        .await;
    assert!(outcome.is_from_cache);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn offline_without_cache_is_network_error() {
    let rig = FacadeRig::new(false);
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_profile", &CacheKey::profile("42"), ReadOptions::default(), || {
            remote_ok(&calls, json!({}))
        })
        .await;

    assert_eq!(outcome.data, None);
    assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::Network);
    assert_eq!(calls.get(), 0);
    assert_eq!(outcome.into_result().unwrap_err().kind, ErrorKind::Network);
}

#[tokio::test]
async fn network_failure_falls_back_to_stale_cache() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::matches("u1");
    rig.cache.save(&key, &json!([{"id": "m1"}]));
    rig.net.clock.advance(600_000);
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read("fetch_matches", &key, ReadOptions::default(), || {
            remote_err(&calls, RemoteError::transport("connection reset"))
        })
        .await;

    assert!(outcome.is_degraded());
    assert_eq!(outcome.data, Some(json!([{"id": "m1"}])));
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn permission_failure_is_surfaced_even_with_cache() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));
    rig.net.clock.advance(600_000);

    let outcome: ReadOutcome<Value> = rig
        .data
        .read("fetch_profile", &key, ReadOptions::default(), || async {
            Err(RemoteError::new("permission denied for table profiles").with_code("42501"))
        })
        .await;

    assert_eq!(outcome.data, None);
    let err = outcome.error.unwrap();
    assert_eq!(err.kind, ErrorKind::Permission);
    assert_eq!(err.user_message(), ErrorKind::Permission.user_message());
}

#[tokio::test]
async fn every_operation_emits_a_sample() {
    let rig = FacadeRig::new(true);
    let calls = Cell::new(0);
    let key = CacheKey::appointments("u1");

    rig.data.read("fetch_appointments", &key, ReadOptions::default(), || remote_ok(&calls, json!([1, 2, 3]))).await;
    rig.data.read("fetch_appointments", &key, ReadOptions::default(), || remote_ok(&calls, json!([]))).await;
    rig.data
        .read("fetch_profile", &CacheKey::profile("x"), ReadOptions::default(), || {
            remote_err(&calls, RemoteError::new("boom"))
        })
        .await;
    rig.data.write("save_note", None, || remote_ok(&calls, json!({"id": "n1"}))).await;

    let samples: Vec<(String, usize)> =
        rig.perf.samples().into_iter().map(|s| (s.name, s.item_count)).collect();
    assert_eq!(
        samples,
        vec![
            ("fetch_appointments".to_string(), 3),
            ("fetch_appointments".to_string(), 3),
            ("fetch_profile".to_string(), 0),
            ("save_note".to_string(), 1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn read_with_retry_recovers_from_transient_failures() {
    let rig = FacadeRig::new(true);
    let mut notices = rig.notifier.subscribe();
    let mut retry = RetryCoordinator::default();
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read_with_retry("fetch_chat", &CacheKey::chat("m1"), ReadOptions::default(), &mut retry, || {
            let result = if calls.get() < 2 { Err(RemoteError::transport("timeout")) } else { Ok(json!(["hi"])) };
            remote(&calls, result)
        })
        .await;

    assert_eq!(outcome.data, Some(json!(["hi"])));
    assert!(!outcome.is_from_cache);
    assert_eq!(calls.get(), 3);
    assert_eq!(retry.attempts(), 0);
    assert!(notices.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn read_with_retry_notifies_once_at_ceiling() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::chat("m1");
    rig.cache.save(&key, &json!(["cached"]));
    rig.net.clock.advance(600_000);
    let mut notices = rig.notifier.subscribe();
    let mut retry = RetryCoordinator::new(RetryPolicy { ceiling: 2, ..RetryPolicy::default() });
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read_with_retry("fetch_chat", &key, ReadOptions::default(), &mut retry, || {
            remote_err(&calls, RemoteError::transport("timeout"))
        })
        .await;

    assert_eq!(calls.get(), 3);
    assert!(outcome.is_degraded());
    assert_eq!(outcome.data, Some(json!(["cached"])));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.topic, "fetch_chat");
    assert!(notices.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn read_with_retry_never_retries_validation() {
    let rig = FacadeRig::new(true);
    let mut retry = RetryCoordinator::default();
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .read_with_retry("fetch_profile", &CacheKey::profile("1"), ReadOptions::default(), &mut retry, || {
            remote_err(&calls, RemoteError::new("invalid input syntax").with_status(422))
        })
        .await;

    assert_eq!(calls.get(), 1);
    assert_eq!(outcome.error.unwrap().kind, ErrorKind::Validation);
}

#[tokio::test]
async fn write_merges_into_existing_cache_entry() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A", "age": 40}));
    let calls = Cell::new(0);

    let outcome = rig.data.write("save_profile", Some(&key), || remote_ok(&calls, json!({"age": 41}))).await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.into_result().unwrap(), json!({"age": 41}));
    assert_eq!(rig.cache.get_stale::<Value>(&key), Some(json!({"name": "A", "age": 41})));
}

#[tokio::test]
async fn write_does_not_create_cache_entries() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    let calls = Cell::new(0);

    rig.data.write("save_profile", Some(&key), || remote_ok(&calls, json!({"age": 41}))).await;
    assert_eq!(rig.cache.get_stale::<Value>(&key), None);
}

#[tokio::test]
async fn failed_write_leaves_cache_alone() {
    let rig = FacadeRig::new(true);
    let key = CacheKey::profile("42");
    rig.cache.save(&key, &json!({"name": "A"}));

    let outcome: WriteOutcome<Value> = rig
        .data
        .write("save_profile", Some(&key), || async { Err(RemoteError::new("JWT expired").with_status(401)) })
        .await;

    assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::Auth);
    assert_eq!(rig.cache.get_stale::<Value>(&key), Some(json!({"name": "A"})));
}

#[tokio::test]
async fn write_while_offline_still_calls_remote() {
    let rig = FacadeRig::new(true);
    rig.net.go_offline();
    let calls = Cell::new(0);

    let outcome = rig
        .data
        .write("save_profile", None, || remote_err(&calls, RemoteError::new("fetch failed")))
        .await;

    assert_eq!(calls.get(), 1);
    assert_eq!(outcome.error.unwrap().kind, ErrorKind::Network);
}

#[tokio::test]
async fn write_validated_rejects_locally() {
    let rig = FacadeRig::new(true);
    let calls = Cell::new(0);
    let profile = ConsumerProfile { name: "Dana".into(), email: "not-an-email".into(), ..Default::default() };

    let outcome = rig
        .data
        .write_validated("save_profile", &profile, None, || remote_ok(&calls, json!({})))
        .await;

    assert_eq!(calls.get(), 0);
    assert_eq!(outcome.error.unwrap().kind, ErrorKind::Validation);
    assert_eq!(rig.perf.samples().len(), 1);
}

#[tokio::test]
async fn write_validated_passes_through_valid_input() {
    let rig = FacadeRig::new(true);
    let calls = Cell::new(0);
    let message = ChatMessage { match_id: "m1".into(), body: "hello".into(), ..Default::default() };

    let outcome = rig
        .data
        .write_validated("send_message", &message, None, || remote_ok(&calls, json!({"id": "c1"})))
        .await;

    assert_eq!(calls.get(), 1);
    assert!(outcome.is_ok());
}
