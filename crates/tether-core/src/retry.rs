// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Retry policy for endpoint connection supervision.
//!
//! Connection hosts reconnect with linear backoff: the delay before the
//! n-th retry is `base_delay * n`, and supervision gives up once the
//! configured attempt ceiling is reached. Terminal failures (registration
//! deleted, credential rejected) are never retried.
//!
//! # Example
//!
//! ```
//! use tether_core::retry::{RetryPolicy, RetryDecision};
//! use tether_core::error::ConnectError;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//!
//! match policy.decide(&ConnectError::transient("blip"), 2) {
//!     RetryDecision::Retry(delay) => assert_eq!(delay, Duration::from_millis(10_000)),
//!     RetryDecision::GiveUp => unreachable!(),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConnectError;

// =============================================================================
// Retry Policy
// =============================================================================

/// Configuration for the connection retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of consecutive transient failures before supervision
    /// gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay; the n-th retry waits `base_delay * n`.
    #[serde(default = "default_base_delay")]
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
}

fn default_max_attempts() -> u32 {
    30
}

fn default_base_delay() -> Duration {
    Duration::from_millis(5000)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt ceiling.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Returns the backoff delay before the given retry attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Decides whether to retry after a failure on the given attempt
    /// (1-based count of consecutive transient failures).
    pub fn decide(&self, error: &ConnectError, attempt: u32) -> RetryDecision {
        if error.is_terminal() || !error.is_transient() {
            return RetryDecision::GiveUp;
        }
        if attempt > self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.delay_for(attempt))
    }
}

// =============================================================================
// Retry Decision
// =============================================================================

/// Decision on whether to retry a failed connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Do not retry; supervision is over.
    GiveUp,
}

// Duration serialization helper
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.base_delay, Duration::from_millis(5000));
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::new().with_base_delay(Duration::from_millis(100));

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(5), Duration::from_millis(500));
    }

    #[test]
    fn test_transient_retries_until_ceiling() {
        let policy = RetryPolicy::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(10));
        let error = ConnectError::transient("blip");

        assert_eq!(
            policy.decide(&error, 1),
            RetryDecision::Retry(Duration::from_millis(10))
        );
        assert_eq!(
            policy.decide(&error, 3),
            RetryDecision::Retry(Duration::from_millis(30))
        );
        assert_eq!(policy.decide(&error, 4), RetryDecision::GiveUp);
    }

    #[test]
    fn test_terminal_errors_never_retry() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(&ConnectError::not_found("ep-1"), 1),
            RetryDecision::GiveUp
        );
        assert_eq!(
            policy.decide(&ConnectError::unauthorized("ep-1"), 1),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_serialization() {
        let policy = RetryPolicy::new()
            .with_max_attempts(10)
            .with_base_delay(Duration::from_millis(250));
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"base_delay\":250"));

        let parsed: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let parsed: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, RetryPolicy::default());
    }
}
