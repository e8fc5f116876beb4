// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Active connectivity probes.

use std::future::Future;
use std::pin::Pin;

use tokio::net::TcpStream;

/// Error type for probe attempts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("probe failed: {0}")]
    Unreachable(String),
}

/// Future returned by [`Probe::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProbeError>> + Send + 'a>>;

/// A network round trip to a stable external endpoint.
///
/// The monitor bounds every probe with its own timeout, so implementations
/// need not.
pub trait Probe: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

/// Probe that opens (and immediately drops) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    /// `addr` is a `host:port` pair.
    pub fn new(addr: impl Into<String>) -> Self {
        TcpProbe { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Probe for TcpProbe {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            TcpStream::connect(self.addr.as_str())
                .await
                .map(drop)
                .map_err(|e| ProbeError::Unreachable(e.to_string()))
        })
    }
}
