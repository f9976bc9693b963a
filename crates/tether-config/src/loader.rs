// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for tether.
//!
//! The loader reads YAML or TOML by file extension, applies environment
//! variable overrides, and validates the result.
//!
//! # Environment Variable Override
//!
//! Scalar settings can be overridden without touching the file:
//!
//! ```text
//! TETHER_SUPERVISOR_MAX_RETRY_COUNT=10
//! TETHER_SUPERVISOR_BASE_RETRY_DELAY_MS=1000
//! TETHER_SUPERVISOR_CONNECT_TIMEOUT_MS=30000
//! TETHER_RECONCILER_HARD_DELETE=true
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::TetherConfig;

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads tether configuration from files with environment overrides.
///
/// # Examples
///
/// ```no_run
/// use tether_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("tether.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether environment overrides are applied.
    apply_env_overrides: bool,
}

impl ConfigLoader {
    /// Creates a loader with the default `TETHER` prefix and environment
    /// overrides enabled.
    pub fn new() -> Self {
        Self {
            env_prefix: "TETHER".to_string(),
            apply_env_overrides: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment overrides.
    pub fn with_env_overrides(mut self, enabled: bool) -> Self {
        self.apply_env_overrides = enabled;
        self
    }

    /// Loads, overrides, and validates a configuration file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<TetherConfig> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = self.parse(path, &contents)?;

        if self.apply_env_overrides {
            self.override_from_env(&mut config)?;
        }

        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Returns the built-in defaults with environment overrides applied.
    pub fn load_defaults(&self) -> ConfigResult<TetherConfig> {
        let mut config = TetherConfig::default();
        if self.apply_env_overrides {
            self.override_from_env(&mut config)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn parse(&self, path: &Path, contents: &str) -> ConfigResult<TetherConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(contents)
                .map_err(|e| ConfigError::parse(path, e.to_string())),
            Some("toml") => {
                toml::from_str(contents).map_err(|e| ConfigError::parse(path, e.to_string()))
            }
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    fn override_from_env(&self, config: &mut TetherConfig) -> ConfigResult<()> {
        if let Some(value) =
            self.env_value::<u32>("SUPERVISOR_MAX_RETRY_COUNT")?
        {
            config.supervisor.max_retry_count = value;
        }
        if let Some(value) = self.env_value::<u64>("SUPERVISOR_BASE_RETRY_DELAY_MS")? {
            config.supervisor.base_retry_delay_ms = value;
        }
        if let Some(value) = self.env_value::<u64>("SUPERVISOR_CONNECT_TIMEOUT_MS")? {
            config.supervisor.connect_timeout_ms = Some(value);
        }
        if let Some(value) = self.env_value::<bool>("RECONCILER_HARD_DELETE")? {
            config.reconciler.hard_delete = value;
        }
        Ok(())
    }

    fn env_value<T>(&self, suffix: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let variable = format!("{}_{}", self.env_prefix, suffix);
        match env::var(&variable) {
            Ok(raw) => {
                let value = raw
                    .parse::<T>()
                    .map_err(|e| ConfigError::invalid_env(&variable, e.to_string()))?;
                debug!(variable = %variable, "Applied environment override");
                Ok(Some(value))
            }
            Err(_) => Ok(None),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "tether.yaml",
            "supervisor:\n  max_retry_count: 3\n  base_retry_delay_ms: 100\n",
        );

        let config = ConfigLoader::new()
            .with_env_overrides(false)
            .load(&path)
            .unwrap();
        assert_eq!(config.supervisor.max_retry_count, 3);
        assert_eq!(config.supervisor.base_retry_delay_ms, 100);
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "tether.toml",
            "[supervisor]\nmax_retry_count = 7\n\n[reconciler]\nhard_delete = true\n",
        );

        let config = ConfigLoader::new()
            .with_env_overrides(false)
            .load(&path)
            .unwrap();
        assert_eq!(config.supervisor.max_retry_count, 7);
        assert!(config.reconciler.hard_delete);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tether.ini", "whatever");

        let error = ConfigLoader::new().load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let error = ConfigLoader::new().load("/nonexistent/tether.yaml").unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tether.yaml", "supervisor:\n  max_retry_count: 0\n");

        let error = ConfigLoader::new()
            .with_env_overrides(false)
            .load(&path)
            .unwrap_err();
        assert!(matches!(error, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "tether.yaml", "supervisor:\n  max_retry_count: 3\n");

        // A unique prefix keeps this test independent of the environment
        // and of other tests running in parallel.
        std::env::set_var("TETHER_TEST_OVR_SUPERVISOR_MAX_RETRY_COUNT", "9");
        let config = ConfigLoader::new()
            .with_env_prefix("TETHER_TEST_OVR")
            .load(&path)
            .unwrap();
        std::env::remove_var("TETHER_TEST_OVR_SUPERVISOR_MAX_RETRY_COUNT");

        assert_eq!(config.supervisor.max_retry_count, 9);
    }

    #[test]
    fn test_invalid_env_override() {
        std::env::set_var("TETHER_TEST_BAD_SUPERVISOR_MAX_RETRY_COUNT", "lots");
        let error = ConfigLoader::new()
            .with_env_prefix("TETHER_TEST_BAD")
            .load_defaults()
            .unwrap_err();
        std::env::remove_var("TETHER_TEST_BAD_SUPERVISOR_MAX_RETRY_COUNT");

        assert!(matches!(error, ConfigError::InvalidEnvOverride { .. }));
    }
}
