// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-registry
//!
//! Registry-side reconciliation for tether.
//!
//! This crate merges discovered endpoint sets into the persisted registry:
//!
//! - **Reconciler**: [`EndpointReconciler`] diffs a discovery result against
//!   the application's registered endpoints and applies
//!   add/update/disable/delete transitions, publishing registry events
//! - **Cascades**: application deleted/disabled/enabled events fan out to
//!   the application's endpoints with the same persist+notify pattern
//! - **Memory**: [`InMemoryRegistrationStore`] for tests and embedded use
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_registry::{EndpointReconciler, ReconcileOptions};
//!
//! let reconciler = EndpointReconciler::new(store, broker);
//! let summary = reconciler
//!     .process_discovery_results(&ctx, discovered, &ReconcileOptions::new("d1", "app-1"))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod memory;
pub mod reconciler;

pub use memory::InMemoryRegistrationStore;
pub use reconciler::{EndpointReconciler, ReconcileOptions, ReconcileSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
