// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Field-level merge of JSON payloads.
//!
//! Merge rules:
//! - Object into object: every top-level field of the patch replaces the
//!   same field of the base; fields the patch does not mention are kept
//! - Anything else: the patch replaces the base wholesale
//!
//! Used both for realtime updates (patch a held record) and for cache
//! write-through (patch a cached payload without dropping unwritten fields).

use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::Record;

/// Merges `patch` into `base` field by field.
pub fn merge_fields(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (field, value) in patch {
                base.insert(field.clone(), value.clone());
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// Applies a field patch to a record, re-mapping the result into the domain shape.
pub fn patch_record<R: Record>(current: &R, patch: &Value) -> Result<R> {
    let mut value = serde_json::to_value(current)?;
    merge_fields(&mut value, patch);
    serde_json::from_value(value)
        .map_err(|e| Error::Mapping { tag: R::TAG.as_str(), reason: e.to_string() })
}

/// Maps a raw remote row into the domain shape.
pub fn map_record<R: Record>(payload: &Value) -> Result<R> {
    R::deserialize(payload)
        .map_err(|e| Error::Mapping { tag: R::TAG.as_str(), reason: e.to_string() })
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
