//! Retry with exponential backoff.
//!
//! Only transient failures (see [`Error::is_transient`]) are retried.
//! Corruption is never retried: it is handled by backup restoration instead.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy with `max_attempts` and the default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Exhausting the attempts on a
    /// transient error yields [`Error::Persistence`] wrapping the last error.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    tracing::error!(
                        "All {} attempts failed for {}: {}",
                        max_attempts,
                        operation,
                        err
                    );
                    return Err(Error::Persistence {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let wait = self.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {} failed for {}, retrying in {:?}: {}",
                        attempt,
                        operation,
                        wait,
                        err
                    );
                    if !wait.is_zero() {
                        thread::sleep(wait);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
