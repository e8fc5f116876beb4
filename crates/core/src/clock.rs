// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock abstraction.
//!
//! Cache freshness is decided against wall-clock milliseconds. Every component
//! that needs "now" takes a [`ClockSource`] so tests can drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a manual clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }
}

impl<C: ClockSource> ClockSource for &C {
    fn now_ms(&self) -> u64 {
        (*self).now_ms()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a manual clock reading `initial_ms`.
    pub fn new(initial_ms: u64) -> Self {
        ManualClock { time_ms: AtomicU64::new(initial_ms) }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
