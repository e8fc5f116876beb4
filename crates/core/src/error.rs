// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dl-core operations.

use thiserror::Error;

/// All possible errors that can occur in dl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid type tag: '{0}'\n  hint: valid tags are: profile, draft, match, appointment, chat_message")]
    InvalidTypeTag(String),

    #[error("invalid cache key: '{0}'\n  hint: keys look like '<tag>_<id>', e.g. 'profile_42'")]
    InvalidCacheKey(String),

    #[error("cannot map {tag} payload: {reason}")]
    Mapping { tag: &'static str, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for dl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
