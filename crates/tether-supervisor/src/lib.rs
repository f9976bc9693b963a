// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-supervisor
//!
//! Edge-side activation supervision for tether.
//!
//! This crate manages live connections to registered endpoints:
//!
//! - **Host**: [`EndpointConnectionHost`] runs one endpoint's connection
//!   lifecycle with linear-backoff reconnects, reset support, and
//!   terminal-error classification
//! - **Supervisor**: [`ActivationSupervisor`] owns the id→host collection
//!   and exposes the activate/deactivate/attach/detach/status operations
//!   invoked by the upstream command layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_supervisor::ActivationSupervisor;
//!
//! let supervisor = ActivationSupervisor::new(store, opener)
//!     .with_retry_policy(policy);
//!
//! supervisor.activate(endpoint_id, secret).await?;
//! let status = supervisor.status().await;
//! supervisor.shutdown().await;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod host;
pub mod supervisor;

pub use host::EndpointConnectionHost;
pub use supervisor::{ActivationStatus, ActivationSupervisor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
