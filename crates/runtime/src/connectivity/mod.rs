// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! ```text
//! ┌──────────────┐  became online/offline  ┌─────────────────────┐
//! │ PassiveSignal│────────────────────────►│                     │
//! └──────────────┘                          │ ConnectivityMonitor │──► Transition
//! ┌──────────────┐   bounded round trip     │  (single-flight)    │    (broadcast)
//! │    Probe     │◄─────────────────────────│                     │
//! └──────────────┘                          └─────────────────────┘
//! ```
//!
//! The passive signal is cheap but produces false positives, so "came
//! online" always triggers a probe. "Went offline" is trusted immediately.

mod monitor;
mod probe;
mod signal;

pub use monitor::{ConnectivityMonitor, ConnectivitySnapshot, MonitorOptions, ReconnectWatch};
pub use probe::{Probe, ProbeError, ProbeFuture, TcpProbe};
pub use signal::{ManualSignal, PassiveSignal};

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the monitor currently believes about the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Online,
    Offline,
    /// A probe is in flight.
    Checking,
}

impl ConnectivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityState::Online => "online",
            ConnectivityState::Offline => "offline",
            ConnectivityState::Checking => "checking",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            ConnectivityState::Offline => 0,
            ConnectivityState::Checking => 1,
            ConnectivityState::Online => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            2 => ConnectivityState::Online,
            1 => ConnectivityState::Checking,
            _ => ConnectivityState::Offline,
        }
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change of [`ConnectivityState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
    /// Wall clock milliseconds when the change happened.
    pub at_ms: u64,
}
