// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the driftless runtime.
///
/// Remote failures seen by callers of the data facade are not errors of this
/// type: they are classified into [`crate::DataError`] values and returned
/// inside outcomes. This enum covers setup, persistence and lifecycle faults.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] dl_core::Error),

    #[error("remote error: {0}")]
    Remote(#[from] dl_core::RemoteError),

    #[error("runtime has been shut down")]
    ShutDown,
}

/// A specialized Result type for driftless operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
