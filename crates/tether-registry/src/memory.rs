// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory registration store.
//!
//! A `DashMap`-backed [`RegistrationStore`] for tests and embedded
//! deployments that do not need durable registry state.

use async_trait::async_trait;
use dashmap::DashMap;

use tether_core::error::{StoreError, StoreResult};
use tether_core::registration::EndpointRegistration;
use tether_core::store::RegistrationStore;
use tether_core::types::{ApplicationId, EndpointId};

// =============================================================================
// In-Memory Registration Store
// =============================================================================

/// A thread-safe, in-memory registration store.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    registrations: DashMap<EndpointId, EndpointRegistration>,
}

impl InMemoryRegistrationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored registrations, deleted included.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if the store holds no registrations.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Removes all registrations.
    pub fn clear(&self) {
        self.registrations.clear();
    }

    /// Returns all registrations, sorted by ID.
    pub fn all(&self) -> Vec<EndpointRegistration> {
        let mut out: Vec<_> = self
            .registrations
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        out
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn get(&self, endpoint_id: &EndpointId) -> StoreResult<EndpointRegistration> {
        self.registrations
            .get(endpoint_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(endpoint_id.clone()))
    }

    async fn upsert(&self, registration: EndpointRegistration) -> StoreResult<()> {
        self.registrations.insert(registration.id.clone(), registration);
        Ok(())
    }

    async fn delete(&self, endpoint_id: &EndpointId) -> StoreResult<()> {
        self.registrations.remove(endpoint_id);
        Ok(())
    }

    async fn query_application(
        &self,
        application_id: &ApplicationId,
        include_deleted: bool,
    ) -> StoreResult<Vec<EndpointRegistration>> {
        Ok(self
            .registrations
            .iter()
            .filter(|entry| {
                let registration = entry.value();
                registration.application_id == *application_id
                    && (include_deleted || !registration.is_disabled())
            })
            .map(|entry| entry.value().clone())
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tether_core::types::SecurityMode;

    fn registration(id: &str, app: &str) -> EndpointRegistration {
        EndpointRegistration::new(
            id,
            app,
            format!("opc.tcp://{}:4840", id),
            SecurityMode::SignAndEncrypt,
            "policy",
        )
    }

    #[tokio::test]
    async fn test_get_upsert_delete() {
        let store = InMemoryRegistrationStore::new();
        let reg = registration("ep-1", "app-1");

        assert!(store.get(&EndpointId::new("ep-1")).await.is_err());

        store.upsert(reg.clone()).await.unwrap();
        assert_eq!(store.get(&EndpointId::new("ep-1")).await.unwrap(), reg);

        store.delete(&EndpointId::new("ep-1")).await.unwrap();
        assert!(store.get(&EndpointId::new("ep-1")).await.is_err());

        // Deleting again is a no-op
        store.delete(&EndpointId::new("ep-1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_filters_disabled_unless_included() {
        let store = InMemoryRegistrationStore::new();
        let enabled = registration("ep-1", "app-1");
        let mut disabled = registration("ep-2", "app-1");
        disabled.disable(Utc::now());
        let other_app = registration("ep-3", "app-2");

        store.upsert(enabled).await.unwrap();
        store.upsert(disabled).await.unwrap();
        store.upsert(other_app).await.unwrap();

        let app = ApplicationId::new("app-1");

        let active = store.query_application(&app, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, EndpointId::new("ep-1"));

        let all = store.query_application(&app, true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_all_is_sorted() {
        let store = InMemoryRegistrationStore::new();
        store.upsert(registration("ep-b", "app-1")).await.unwrap();
        store.upsert(registration("ep-a", "app-1")).await.unwrap();

        let ids: Vec<_> = store.all().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![EndpointId::new("ep-a"), EndpointId::new("ep-b")]);
    }
}
