// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-core
//!
//! Core abstractions and shared types for the tether endpoint supervision
//! service.
//!
//! This crate provides the foundational types, traits, and utilities used
//! across all tether components:
//!
//! - **Types**: Identifier newtypes (`EndpointId`, `ApplicationId`,
//!   `DiscovererId`), `ActivationState`, `SecurityMode`, `Secret`
//! - **Registration**: The persisted endpoint record and its logical
//!   identity used by discovery reconciliation
//! - **Error**: Unified error hierarchy with terminal/transient
//!   classification
//! - **Connection**: Opener traits implemented by the protocol stack
//! - **Store**: Registration persistence trait
//! - **Events**: Registry listener trait and fan-out event broker
//! - **Retry**: Linear-backoff retry policy for connection supervision
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_core::types::{EndpointId, Secret};
//! use tether_core::registration::EndpointRegistration;
//! use tether_core::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! let registration = EndpointRegistration::new(
//!     "ep-1", "app-1", "opc.tcp://server:4840",
//!     SecurityMode::SignAndEncrypt, "Basic256Sha256",
//! );
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod registration;
pub mod types;

// =============================================================================
// Collaborator Contracts
// =============================================================================

pub mod connection;
pub mod store;

// =============================================================================
// Events & Retry
// =============================================================================

pub mod events;
pub mod retry;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::{
    error_chain, ConnectError, ConnectResult, ListenerError, ListenerResult, StoreError,
    StoreResult, TetherError, TetherResult,
};
pub use registration::{EndpointIdentity, EndpointRegistration};
pub use types::{ActivationState, ApplicationId, DiscovererId, EndpointId, Secret, SecurityMode};

pub use connection::{ConnectionOpener, EndpointConnection};
pub use store::RegistrationStore;

pub use events::{OperationContext, RegistryEventBroker, RegistryListener};
pub use retry::{RetryDecision, RetryPolicy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
