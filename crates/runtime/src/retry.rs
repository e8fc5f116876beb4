// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry coordination with capped exponential backoff.
//!
//! A [`RetryCoordinator`] is a counter plus a delay formula. It knows nothing
//! about what is retried. Each logical operation stream (a form submission,
//! a background push) owns its own coordinator so unrelated operations
//! never share a counter.
//!
//! [`RetryCoordinator::run`] drives an async operation through the policy
//! and resets the counter whenever it returns.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub cap: Duration,
    /// Retries allowed after the initial attempt.
    pub ceiling: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { base: Duration::from_secs(2), cap: Duration::from_secs(30), ceiling: 3 }
    }
}

impl RetryPolicy {
    /// `min(base * 2^attempts, cap)`, saturating instead of overflowing.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let base = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let cap = u64::try_from(self.cap.as_millis()).unwrap_or(u64::MAX);
        let factor = 1u64.checked_shl(attempts).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempts: u32,
    /// Delay to wait before the next retry.
    pub next_delay: Duration,
}

/// Why [`RetryCoordinator::run`] gave up.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// The last error returned by the operation.
    pub error: E,
    /// Retries performed before giving up.
    pub attempts: u32,
    /// True when the ceiling was reached; false when the error was not retryable.
    pub exhausted: bool,
}

impl<E: fmt::Display> fmt::Display for RetryFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exhausted {
            write!(f, "{} (gave up after {} retries)", self.error, self.attempts)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

/// Per-operation attempt counter.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryCoordinator { policy, attempts: 0 }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> RetryState {
        RetryState { attempts: self.attempts, next_delay: self.delay_for(self.attempts) }
    }

    /// Records one more attempt.
    pub fn increment(&mut self) -> RetryState {
        self.attempts = self.attempts.saturating_add(1);
        self.state()
    }

    /// Back to `{0, base}`.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn delay_for(&self, attempts: u32) -> Duration {
        self.policy.delay_for(attempts)
    }

    /// Whether the policy ceiling has been reached.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.ceiling
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the ceiling is reached, sleeping the backoff delay between tries.
    ///
    /// The counter is reset before returning in every case.
    pub async fn run<T, E, F, Fut>(
        &mut self,
        mut op: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let outcome = loop {
            let error = match op().await {
                Ok(value) => break Ok(value),
                Err(error) => error,
            };

            if !is_retryable(&error) {
                break Err(RetryFailure { error, attempts: self.attempts, exhausted: false });
            }
            if self.exhausted() {
                break Err(RetryFailure { error, attempts: self.attempts, exhausted: true });
            }

            let delay = self.state().next_delay;
            tracing::debug!(attempt = self.attempts + 1, ?delay, "retrying after backoff");
            tokio::time::sleep(delay).await;
            self.increment();
        };

        self.reset();
        outcome
    }
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
