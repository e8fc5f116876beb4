// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Performance samples for facade operations.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One measured operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfSample {
    pub name: String,
    pub duration_ms: u64,
    /// Domain items returned or written; 0 on failure.
    pub item_count: usize,
}

impl PerfSample {
    pub fn new(name: impl Into<String>, elapsed: Duration, item_count: usize) -> Self {
        PerfSample {
            name: name.into(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            item_count,
        }
    }
}

/// Where samples go.
pub trait PerfSink: Send + Sync {
    fn record(&self, sample: PerfSample);
}

/// Logs every sample at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl PerfSink for TracingSink {
    fn record(&self, sample: PerfSample) {
        tracing::debug!(
            name = %sample.name,
            duration_ms = sample.duration_ms,
            items = sample.item_count,
            "perf sample"
        );
    }
}

/// Keeps the most recent samples in memory.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    samples: Mutex<VecDeque<PerfSample>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        MemorySink { capacity: capacity.max(1), samples: Mutex::new(VecDeque::new()) }
    }

    /// Oldest first.
    pub fn samples(&self) -> Vec<PerfSample> {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.samples.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl PerfSink for MemorySink {
    fn record(&self, sample: PerfSample) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }
}

#[cfg(test)]
#[path = "perf_tests.rs"]
mod tests;
