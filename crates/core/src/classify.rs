// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of remote failures.
//!
//! Classification order:
//! 1. Connectivity: if the link is known to be down, the failure is `Network`
//! 2. Structured error code from the remote boundary
//! 3. HTTP-like status code
//! 4. Message patterns
//! 5. Anything unmatched is `Generic`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Taxonomy of failures surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No connectivity or transport failure.
    Network,
    /// Authorization denied.
    Permission,
    /// The requested entity does not exist.
    NotFound,
    /// Payload rejected by the remote schema.
    Validation,
    /// Session invalid or expired.
    Auth,
    /// Unclassified.
    Generic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::Generic => "generic",
        }
    }

    /// Only transport failures are worth retrying automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network)
    }

    /// Short message suitable for showing to a person.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network connection problem, please check your connection",
            ErrorKind::Permission => "you do not have permission to do that",
            ErrorKind::NotFound => "the requested item could not be found",
            ErrorKind::Validation => "some of the submitted information is invalid",
            ErrorKind::Auth => "your session has expired, please sign in again",
            ErrorKind::Generic => "something went wrong, please try again",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure reported by a remote boundary call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Structured error code, when the remote supplies one.
    #[serde(default)]
    pub code: Option<String>,
    /// HTTP-like status, when known.
    #[serde(default)]
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        RemoteError { code: None, status: None, message: message.into() }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// A transport failure (connection refused, timeout, dropped socket).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(message).with_code("network_error")
    }
}

const CODE_TABLE: &[(&str, ErrorKind)] = &[
    ("network_error", ErrorKind::Network),
    ("ECONNREFUSED", ErrorKind::Network),
    ("ECONNRESET", ErrorKind::Network),
    ("ETIMEDOUT", ErrorKind::Network),
    ("PGRST116", ErrorKind::NotFound),
    ("not_found", ErrorKind::NotFound),
    ("42501", ErrorKind::Permission),
    ("permission_denied", ErrorKind::Permission),
    ("PGRST301", ErrorKind::Auth),
    ("PGRST302", ErrorKind::Auth),
    ("invalid_jwt", ErrorKind::Auth),
    ("session_expired", ErrorKind::Auth),
    ("validation_failed", ErrorKind::Validation),
];

const MESSAGE_TABLE: &[(&str, ErrorKind)] = &[
    ("failed to fetch", ErrorKind::Network),
    ("network", ErrorKind::Network),
    ("timed out", ErrorKind::Network),
    ("timeout", ErrorKind::Network),
    ("connection refused", ErrorKind::Network),
    ("connection reset", ErrorKind::Network),
    ("jwt", ErrorKind::Auth),
    ("session", ErrorKind::Auth),
    ("not authenticated", ErrorKind::Auth),
    ("unauthorized", ErrorKind::Auth),
    ("permission denied", ErrorKind::Permission),
    ("row-level security", ErrorKind::Permission),
    ("forbidden", ErrorKind::Permission),
    ("not found", ErrorKind::NotFound),
    ("no rows", ErrorKind::NotFound),
    ("violates", ErrorKind::Validation),
    ("invalid input", ErrorKind::Validation),
    ("is required", ErrorKind::Validation),
];

fn classify_code(code: &str) -> Option<ErrorKind> {
    if let Some((_, kind)) = CODE_TABLE.iter().find(|(c, _)| *c == code) {
        return Some(*kind);
    }
    // SQLSTATE class 22 (data exception) and 23 (integrity constraint violation)
    if code.len() == 5 && (code.starts_with("22") || code.starts_with("23")) {
        return Some(ErrorKind::Validation);
    }
    None
}

fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        401 => Some(ErrorKind::Auth),
        403 => Some(ErrorKind::Permission),
        404 => Some(ErrorKind::NotFound),
        400 | 409 | 422 => Some(ErrorKind::Validation),
        408 | 502 | 503 | 504 => Some(ErrorKind::Network),
        _ => None,
    }
}

fn classify_message(message: &str) -> Option<ErrorKind> {
    let message = message.to_lowercase();
    MESSAGE_TABLE.iter().find(|(pattern, _)| message.contains(pattern)).map(|(_, kind)| *kind)
}

/// Classifies a remote failure.
///
/// `online` is the caller's current belief about connectivity (monitor state
/// combined with the passive signal); when false the failure is `Network`
/// regardless of what the remote said.
pub fn classify(err: &RemoteError, online: bool) -> ErrorKind {
    if !online {
        return ErrorKind::Network;
    }

    err.code
        .as_deref()
        .and_then(classify_code)
        .or_else(|| err.status.and_then(classify_status))
        .or_else(|| classify_message(&err.message))
        .unwrap_or(ErrorKind::Generic)
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
