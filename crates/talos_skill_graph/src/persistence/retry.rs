// SPDX-License-Identifier: MIT OR Apache-2.0
//! Retry policy for graph saves.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retries with exponential backoff: `base_ms * 2^attempt`, capped at `max_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = try once)
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_ms: u64,
    /// Upper bound of a single delay, in milliseconds
    pub max_ms: u64,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_retries,
            base_ms,
            max_ms,
        }
    }

    /// Try once, never retry
    pub fn no_retry() -> Self {
        Self::new(0, 0, 0)
    }

    /// Delay before retry number `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_ms.saturating_mul(multiplier).min(self.max_ms))
    }

    /// Total attempts including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 100, 2_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::new(5, 100, 1_000);
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay(80), Duration::from_millis(1_000));
    }

    #[test]
    fn test_attempt_count() {
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
        assert_eq!(RetryPolicy::default().attempts(), 4);
    }
}
