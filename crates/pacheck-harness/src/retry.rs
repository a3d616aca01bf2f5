//! Retry of whole cases on transient failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::HarnessError;

/// How often a case is attempted and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempts run out. `op` receives the 1-based attempt number and must start
/// from scratch each time.
pub fn with_retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, HarnessError>
where
    F: FnMut(u32) -> Result<T, HarnessError>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(attempt, attempts, error = %e, "transient failure, retrying");
                std::thread::sleep(policy.delay());
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
