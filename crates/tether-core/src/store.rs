// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Registration store abstraction.
//!
//! The persistence backend is an external collaborator; the registry and
//! supervisor only require per-record reads and writes. Individual writes
//! are assumed to be atomic (last-writer-wins); no cross-record transaction
//! support is required by any caller.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::registration::EndpointRegistration;
use crate::types::{ApplicationId, EndpointId};

// =============================================================================
// RegistrationStore
// =============================================================================

/// Persists endpoint registrations.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Returns the registration with the given ID.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no such registration exists.
    async fn get(&self, endpoint_id: &EndpointId) -> StoreResult<EndpointRegistration>;

    /// Creates or replaces a registration.
    async fn upsert(&self, registration: EndpointRegistration) -> StoreResult<()>;

    /// Permanently deletes a registration.
    ///
    /// Deleting an absent registration is a no-op.
    async fn delete(&self, endpoint_id: &EndpointId) -> StoreResult<()>;

    /// Returns all registrations belonging to an application.
    ///
    /// Soft-deleted (disabled) registrations are filtered out unless
    /// `include_deleted` is set.
    async fn query_application(
        &self,
        application_id: &ApplicationId,
        include_deleted: bool,
    ) -> StoreResult<Vec<EndpointRegistration>>;
}
