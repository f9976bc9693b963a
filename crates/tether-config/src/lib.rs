// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-config
//!
//! Configuration schema and loading for tether.
//!
//! - **Schema**: [`TetherConfig`] with supervisor and reconciler sections,
//!   all fields defaulted
//! - **Loader**: [`ConfigLoader`] reads YAML/TOML by extension, applies
//!   `TETHER_*` environment overrides, and validates
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load("tether.yaml")?;
//! let policy = config.supervisor.retry_policy();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{ReconcilerConfig, SupervisorConfig, TetherConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
