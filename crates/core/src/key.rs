// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed cache keys.
//!
//! Cached payloads are addressed by `(TypeTag, id)` and rendered as
//! `{tag}_{id}` when they reach the persistence layer (e.g. `profile_42`).
//! No tag is a prefix of another tag followed by `_`, so a rendered key
//! always parses back to the same pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Entity type a cached payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    /// Authoritative remote profile (consumer or advisor).
    Profile,
    /// Locally held profile draft plus its dirty flag.
    Draft,
    /// Consumer/advisor match.
    Match,
    /// Scheduled meeting between a consumer and an advisor.
    Appointment,
    /// Chat message within a match.
    ChatMessage,
}

impl TypeTag {
    /// All tags, longest rendering first so prefix parsing is unambiguous.
    pub const ALL: [TypeTag; 5] = [
        TypeTag::ChatMessage,
        TypeTag::Appointment,
        TypeTag::Profile,
        TypeTag::Match,
        TypeTag::Draft,
    ];

    /// Returns the string representation used in keys and channel names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Profile => "profile",
            TypeTag::Draft => "draft",
            TypeTag::Match => "match",
            TypeTag::Appointment => "appointment",
            TypeTag::ChatMessage => "chat_message",
        }
    }

    /// Prefix shared by every rendered key of this tag.
    pub fn key_prefix(&self) -> String {
        format!("{}_", self.as_str())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::InvalidTypeTag(s.to_string()))
    }
}

/// Address of a cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub tag: TypeTag,
    pub id: String,
}

impl CacheKey {
    pub fn new(tag: TypeTag, id: impl Into<String>) -> Self {
        CacheKey { tag, id: id.into() }
    }

    pub fn profile(id: impl Into<String>) -> Self {
        Self::new(TypeTag::Profile, id)
    }

    pub fn draft(id: impl Into<String>) -> Self {
        Self::new(TypeTag::Draft, id)
    }

    pub fn matches(id: impl Into<String>) -> Self {
        Self::new(TypeTag::Match, id)
    }

    pub fn appointments(id: impl Into<String>) -> Self {
        Self::new(TypeTag::Appointment, id)
    }

    pub fn chat(id: impl Into<String>) -> Self {
        Self::new(TypeTag::ChatMessage, id)
    }

    /// Parses a rendered key such as `profile_42`.
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tag, self.id)
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        for tag in TypeTag::ALL {
            if let Some(id) = s.strip_prefix(&tag.key_prefix()) {
                if id.is_empty() {
                    break;
                }
                return Ok(CacheKey::new(tag, id));
            }
        }
        Err(Error::InvalidCacheKey(s.to_string()))
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
