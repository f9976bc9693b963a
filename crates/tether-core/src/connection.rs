// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection opener abstraction.
//!
//! The actual protocol stack is an external collaborator. Supervision only
//! needs two seams: opening a link to a registered endpoint, and observing
//! an open link until it drops.
//!
//! # Lifecycle
//!
//! 1. The connection host calls [`ConnectionOpener::open`]
//! 2. On success it holds the returned [`EndpointConnection`] and awaits
//!    [`EndpointConnection::disconnected`]
//! 3. On teardown (reset, deactivation, or link loss) it calls
//!    [`EndpointConnection::close`]; close failures are swallowed and
//!    logged by the caller since the close path of broken links is allowed
//!    to fail

use async_trait::async_trait;

use crate::error::{ConnectError, ConnectResult};
use crate::registration::EndpointRegistration;
use crate::types::Secret;

// =============================================================================
// ConnectionOpener
// =============================================================================

/// Opens supervised connections to registered endpoints.
///
/// Implementations classify failures into the [`ConnectError`] taxonomy at
/// this boundary: `NotFound` when the backing registration is gone,
/// `Unauthorized` when the secret is rejected, `Transient` for everything
/// that is worth retrying.
#[async_trait]
pub trait ConnectionOpener: Send + Sync {
    /// Opens a connection to the endpoint using the given credential.
    async fn open(
        &self,
        endpoint: &EndpointRegistration,
        secret: &Secret,
    ) -> ConnectResult<Box<dyn EndpointConnection>>;
}

// =============================================================================
// EndpointConnection
// =============================================================================

/// An open, supervised link to one endpoint.
#[async_trait]
pub trait EndpointConnection: Send {
    /// Resolves when the underlying link drops, with the cause.
    ///
    /// The future may stay pending for the whole lifetime of a healthy
    /// connection; the supervising host races it against reset and
    /// cancellation signals.
    async fn disconnected(&mut self) -> ConnectError;

    /// Closes the link.
    ///
    /// Best-effort: callers swallow and log errors rather than propagating
    /// them, because closing an already-broken link may fail spuriously.
    async fn close(self: Box<Self>) -> ConnectResult<()>;
}
