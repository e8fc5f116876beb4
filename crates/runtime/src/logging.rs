// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup shared by binaries embedding the runtime.

use std::fs;
use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` when
/// `verbose` is true. Output goes to `log_path` (appending, no ANSI) when the
/// file can be opened and to stderr otherwise. Calling this more than once is
/// a no-op.
pub fn init(log_path: Option<&Path>, verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = log_path.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        fs::OpenOptions::new().create(true).append(true).open(path).ok()
    });

    let result = if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
