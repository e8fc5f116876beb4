// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    type_tag = { Error::InvalidTypeTag("widget".into()), "widget" },
    cache_key = { Error::InvalidCacheKey("nope".into()), "profile_42" },
    mapping = { Error::Mapping { tag: "appointment", reason: "missing id".into() }, "missing id" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
