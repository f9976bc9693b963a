// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for tether.
//!
//! All fields have defaults, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use tether_core::retry::RetryPolicy;

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Root Config
// =============================================================================

/// Root configuration for tether.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    /// Activation supervisor settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Discovery reconciler settings.
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl TetherConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.supervisor.validate()?;
        Ok(())
    }
}

// =============================================================================
// Supervisor Config
// =============================================================================

/// Settings for the activation supervisor and its connection hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Maximum number of consecutive transient connection failures before
    /// a host gives up.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Base backoff delay in milliseconds; the n-th retry waits
    /// `base_retry_delay_ms * n`.
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Optional bound on each individual connect attempt, in milliseconds.
    /// Unset means attempts are only bounded by the protocol stack itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
}

fn default_max_retry_count() -> u32 {
    30
}

fn default_base_retry_delay_ms() -> u64 {
    5000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            connect_timeout_ms: None,
        }
    }
}

impl SupervisorConfig {
    /// Validates the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_retry_count == 0 {
            return Err(ConfigError::validation(
                "supervisor.max_retry_count",
                "must be at least 1",
            ));
        }
        if let Some(0) = self.connect_timeout_ms {
            return Err(ConfigError::validation(
                "supervisor.connect_timeout_ms",
                "must be positive when set",
            ));
        }
        Ok(())
    }

    /// Returns the retry policy configured here.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_retry_count)
            .with_base_delay(Duration::from_millis(self.base_retry_delay_ms))
    }

    /// Returns the per-attempt connect timeout, if configured.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

// =============================================================================
// Reconciler Config
// =============================================================================

/// Settings for the discovery reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcilerConfig {
    /// Permanently delete stale endpoints instead of disabling them.
    #[serde(default)]
    pub hard_delete: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { hard_delete: false }
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
        let config = TetherConfig::default();
        assert_eq!(config.supervisor.max_retry_count, 30);
        assert_eq!(config.supervisor.base_retry_delay_ms, 5000);
        assert_eq!(config.supervisor.connect_timeout_ms, None);
        assert!(!config.reconciler.hard_delete);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_valid() {
        let config: TetherConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, TetherConfig::default());
    }

    #[test]
    fn test_retry_policy_conversion() {
        let config = SupervisorConfig {
            max_retry_count: 5,
            base_retry_delay_ms: 100,
            connect_timeout_ms: Some(2000),
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_validation_rejects_zero_retry_count() {
        let config = SupervisorConfig {
            max_retry_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_connect_timeout() {
        let config = SupervisorConfig {
            connect_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<TetherConfig, _> = serde_yaml::from_str("bogus: true");
        assert!(result.is_err());
    }
}
