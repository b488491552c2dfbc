// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff around single remote calls.
//!
//! Fatal errors (permission-denied, unauthenticated, invalid-argument) are
//! returned after one attempt. A not-found answer is returned as is: the store
//! responded, so it counts as a healthy round trip. Anything else is retried
//! until the attempt budget runs out, updating the shared
//! [`ConnectionMonitor`] on the way.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::connection::{ConnectionMonitor, ConnectionState};
use crate::store::{StoreErrorCode, StoreResult};

/// Base delay before retrying after failed attempt number `attempt`
/// (1-based). Attempts past the end of `base_delays_ms` reuse the last entry.
pub fn backoff_delay(base_delays_ms: &[u64], attempt: u32) -> Duration {
    let index = usize::try_from(attempt.saturating_sub(1)).unwrap_or(usize::MAX);
    let ms = base_delays_ms
        .get(index)
        .or_else(|| base_delays_ms.last())
        .copied()
        .unwrap_or(0);
    Duration::from_millis(ms)
}

fn jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::random::<u64>() % max_ms.saturating_add(1))
}

/// Runs remote operations with retry and backoff.
pub struct RetryExecutor {
    config: RetryConfig,
    monitor: Arc<ConnectionMonitor>,
    consecutive_failures: AtomicU32,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, monitor: Arc<ConnectionMonitor>) -> Self {
        Self {
            config,
            monitor,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Failed attempts since the last success, across all operations.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// Run `operation` with the configured default attempt budget.
    pub async fn run_default<T, F, Fut>(&self, name: &str, operation: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        self.run(name, self.config.max_attempts, operation).await
    }

    /// Run `operation` up to `max_attempts` times.
    ///
    /// A budget of 0 is treated as 1. Fatal errors are returned after the
    /// first attempt. `NotFound` is not retried either, even though it is not
    /// fatal: it is returned at once and the connection is marked `Online`,
    /// since the store answered. Every other error is retried.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        max_attempts: u32,
        mut operation: F,
    ) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    self.consecutive_failures.store(0, Ordering::Release);
                    self.monitor.set(ConnectionState::Online);
                    return Ok(value);
                }
                Err(err) if err.code == StoreErrorCode::NotFound => {
                    self.consecutive_failures.store(0, Ordering::Release);
                    self.monitor.set(ConnectionState::Online);
                    return Err(err);
                }
                Err(err) => {
                    self.consecutive_failures.fetch_add(1, Ordering::AcqRel);

                    if err.is_fatal() {
                        tracing::debug!(operation = name, error = %err, "fatal error, not retrying");
                        return Err(err);
                    }

                    if attempt >= max_attempts {
                        self.monitor.set(ConnectionState::Offline);
                        tracing::warn!(
                            operation = name,
                            attempts = attempt,
                            error = %err,
                            "giving up after repeated failures"
                        );
                        return Err(err);
                    }

                    self.monitor.set(ConnectionState::Reconnecting);
                    let delay = backoff_delay(&self.config.base_delays_ms, attempt)
                        + jitter(self.config.jitter_ms);
                    tracing::debug!(
                        operation = name,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
