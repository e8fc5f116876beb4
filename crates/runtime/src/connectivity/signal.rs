// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Passive connectivity signal boundary.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// The host's own idea of whether a network is available.
///
/// Implementations publish `true` when the host reports it came online and
/// `false` when it went offline.
pub trait PassiveSignal: Send + Sync {
    fn is_online(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<bool>;
}

/// A passive signal driven by hand.
///
/// Used by hosts without an OS signal (it then simply stays online) and by
/// tests.
#[derive(Debug)]
pub struct ManualSignal {
    online: AtomicBool,
    events: broadcast::Sender<bool>,
}

impl ManualSignal {
    pub fn new(online: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        ManualSignal { online: AtomicBool::new(online), events }
    }

    /// Updates the signal and notifies subscribers when the value changed.
    pub fn set_online(&self, online: bool) {
        if self.online.swap(online, Ordering::AcqRel) != online {
            let _ = self.events.send(online);
        }
    }

    /// Re-announces the current value even if it did not change.
    ///
    /// Hosts emit duplicate "online" events; this reproduces that.
    pub fn announce(&self) {
        let _ = self.events.send(self.is_online());
    }
}

impl PassiveSignal for ManualSignal {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }
}
