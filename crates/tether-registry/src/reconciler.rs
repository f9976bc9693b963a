// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Discovery-driven registry reconciliation.
//!
//! A discovery pass produces the set of endpoints a discoverer currently
//! observes for one application. The reconciler merges that set against the
//! persisted registry state and applies the add/update/disable/delete
//! transitions, publishing a domain event for each.
//!
//! # Algorithm
//!
//! Endpoints are matched by [logical identity](tether_core::EndpointIdentity);
//! the pass partitions into three phases executed strictly in order:
//!
//! 1. **Removals**: existing endpoints that were not re-discovered are
//!    disabled (or hard-deleted). A discoverer only touches endpoints it
//!    owns; everything else counts as unchanged.
//! 2. **Updates**: endpoints present on both sides have their observable
//!    fields replaced with the fresh observation. Disabled endpoints are
//!    re-enabled in the process.
//! 3. **Additions**: newly observed endpoints are persisted and announced
//!    with a "new" followed by an "enabled" event.
//!
//! The pass is idempotent (a second run with the same observations lands
//! everything in "unchanged") and partial-failure-tolerant: an error while
//! touching one endpoint is logged, folded into the unchanged count, and
//! never stops the remaining items.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use tether_core::error::{StoreError, StoreResult};
use tether_core::events::{OperationContext, RegistryEventBroker};
use tether_core::registration::{EndpointIdentity, EndpointRegistration};
use tether_core::store::RegistrationStore;
use tether_core::types::{ApplicationId, DiscovererId};

// =============================================================================
// Options & Summary
// =============================================================================

/// Options for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// The discoverer that produced the observations. Ownership isolation
    /// is enforced against this ID.
    pub discoverer_id: DiscovererId,
    /// The application whose endpoints are being reconciled.
    pub application_id: ApplicationId,
    /// Permanently delete stale endpoints instead of disabling them.
    pub hard_delete: bool,
    /// Only register new endpoints; skip the removal phase entirely.
    pub register_only: bool,
}

impl ReconcileOptions {
    /// Creates options with soft-delete semantics and the removal phase
    /// enabled.
    pub fn new(
        discoverer_id: impl Into<DiscovererId>,
        application_id: impl Into<ApplicationId>,
    ) -> Self {
        Self {
            discoverer_id: discoverer_id.into(),
            application_id: application_id.into(),
            hard_delete: false,
            register_only: false,
        }
    }

    /// Enables hard deletion of stale endpoints.
    pub fn with_hard_delete(mut self) -> Self {
        self.hard_delete = true;
        self
    }

    /// Restricts the pass to registering new endpoints.
    pub fn register_only(mut self) -> Self {
        self.register_only = true;
        self
    }
}

/// Counts of the transitions applied by one reconciliation pass.
///
/// Items that could not be processed are folded into `unchanged`; the
/// per-item log lines are the only place such failures surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Newly registered endpoints.
    pub added: usize,
    /// Endpoints whose fields were refreshed (including re-enables).
    pub updated: usize,
    /// Endpoints disabled or deleted because they were no longer seen.
    pub removed: usize,
    /// Endpoints left untouched.
    pub unchanged: usize,
}

impl ReconcileSummary {
    /// Returns `true` if the pass changed registry state.
    pub fn has_changes(&self) -> bool {
        self.added != 0 || self.updated != 0 || self.removed != 0
    }
}

// =============================================================================
// Endpoint Reconciler
// =============================================================================

/// Reconciles discovered endpoint sets against the registration store and
/// publishes the resulting registry events.
pub struct EndpointReconciler {
    store: Arc<dyn RegistrationStore>,
    broker: Arc<RegistryEventBroker>,
}

impl EndpointReconciler {
    /// Creates a new reconciler.
    pub fn new(store: Arc<dyn RegistrationStore>, broker: Arc<RegistryEventBroker>) -> Self {
        Self { store, broker }
    }

    /// Processes the result of one discovery pass.
    ///
    /// # Errors
    ///
    /// Only the initial read of the application's existing endpoints can
    /// fail the pass as a whole; every per-endpoint failure afterwards is
    /// logged and counted as unchanged.
    pub async fn process_discovery_results(
        &self,
        context: &OperationContext,
        discovered: Vec<EndpointRegistration>,
        options: &ReconcileOptions,
    ) -> StoreResult<ReconcileSummary> {
        let existing = self
            .store
            .query_application(&options.application_id, true)
            .await?;

        let mut existing_by_identity: HashMap<EndpointIdentity, EndpointRegistration> =
            HashMap::with_capacity(existing.len());
        for registration in existing {
            existing_by_identity.insert(registration.identity(), registration);
        }

        // Last observation wins for duplicate identities within one batch.
        let mut discovered_by_identity: HashMap<EndpointIdentity, EndpointRegistration> =
            HashMap::with_capacity(discovered.len());
        for registration in discovered {
            discovered_by_identity.insert(registration.identity(), registration);
        }

        let mut summary = ReconcileSummary::default();

        // Phase 1: removals. Must run before additions so a stale record
        // can never shadow a fresh one.
        if !options.register_only {
            for (identity, registration) in &existing_by_identity {
                if discovered_by_identity.contains_key(identity) {
                    continue;
                }
                self.remove_one(context, registration, options, &mut summary)
                    .await;
            }
        }

        // Phase 2: updates of endpoints seen on both sides.
        for (identity, observed) in &discovered_by_identity {
            if let Some(registration) = existing_by_identity.get(identity) {
                self.update_one(context, registration, observed, options, &mut summary)
                    .await;
            }
        }

        // Phase 3: additions.
        for (identity, observed) in &discovered_by_identity {
            if existing_by_identity.contains_key(identity) {
                continue;
            }
            self.add_one(context, observed, &mut summary).await;
        }

        if summary.added != 0 || summary.removed != 0 {
            tracing::info!(
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                unchanged = summary.unchanged,
                discoverer_id = %options.discoverer_id,
                application_id = %options.application_id,
                "Processed endpoint discovery results"
            );
        }

        Ok(summary)
    }

    // =========================================================================
    // Application lifecycle cascades
    // =========================================================================

    /// Hard-deletes every endpoint of a deleted application.
    pub async fn on_application_deleted(
        &self,
        context: &OperationContext,
        application_id: &ApplicationId,
    ) -> StoreResult<()> {
        let endpoints = self.store.query_application(application_id, true).await?;
        for registration in endpoints {
            if let Err(e) = self.store.delete(&registration.id).await {
                tracing::error!(
                    endpoint_id = %registration.id,
                    error = %e,
                    "Failed deleting endpoint of deleted application"
                );
                continue;
            }
            self.notify_deleted(context, &registration).await;
        }
        Ok(())
    }

    /// Disables every enabled endpoint of a disabled application.
    pub async fn on_application_disabled(
        &self,
        context: &OperationContext,
        application_id: &ApplicationId,
    ) -> StoreResult<()> {
        let endpoints = self.store.query_application(application_id, true).await?;
        for registration in endpoints {
            if registration.is_disabled() {
                continue;
            }
            if let Err(e) = self.disable_and_notify(context, &registration).await {
                tracing::error!(
                    endpoint_id = %registration.id,
                    error = %e,
                    "Failed disabling endpoint of disabled application"
                );
            }
        }
        Ok(())
    }

    /// Re-enables every disabled endpoint of an enabled application.
    pub async fn on_application_enabled(
        &self,
        context: &OperationContext,
        application_id: &ApplicationId,
    ) -> StoreResult<()> {
        let endpoints = self.store.query_application(application_id, true).await?;
        for registration in endpoints {
            if !registration.is_disabled() {
                continue;
            }
            let mut enabled = registration.clone();
            enabled.enable();
            match self.store.upsert(enabled.clone()).await {
                Ok(()) => self.notify_enabled(context, &enabled).await,
                Err(e) => {
                    tracing::error!(
                        endpoint_id = %registration.id,
                        error = %e,
                        "Failed re-enabling endpoint of enabled application"
                    );
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Per-item transitions
    // =========================================================================

    async fn remove_one(
        &self,
        context: &OperationContext,
        registration: &EndpointRegistration,
        options: &ReconcileOptions,
        summary: &mut ReconcileSummary,
    ) {
        // Only touch endpoints this discoverer owns.
        if !registration.is_owned_by(&options.discoverer_id) {
            summary.unchanged += 1;
            return;
        }

        let result = if options.hard_delete {
            self.delete_and_notify(context, registration).await
        } else if !registration.is_disabled() {
            self.disable_and_notify(context, registration).await
        } else {
            summary.unchanged += 1;
            return;
        };

        match result {
            Ok(()) => summary.removed += 1,
            Err(e) => {
                summary.unchanged += 1;
                tracing::error!(
                    endpoint_id = %registration.id,
                    error = %e,
                    "Failed removing endpoint during discovery"
                );
            }
        }
    }

    async fn update_one(
        &self,
        context: &OperationContext,
        registration: &EndpointRegistration,
        observed: &EndpointRegistration,
        options: &ReconcileOptions,
        summary: &mut ReconcileSummary,
    ) {
        // An endpoint owned by another discoverer is only claimable while
        // it is disabled.
        let claimable = registration.discoverer_id.is_none()
            || registration.is_owned_by(&options.discoverer_id)
            || registration.is_disabled();
        if !claimable {
            summary.unchanged += 1;
            return;
        }

        let was_disabled = registration.is_disabled();
        if !was_disabled && !registration.fields_differ(observed) {
            summary.unchanged += 1;
            return;
        }

        let mut updated = registration.clone();
        updated.absorb(observed);

        match self.store.upsert(updated.clone()).await {
            Ok(()) => {
                self.notify_updated(context, &updated).await;
                if was_disabled {
                    self.notify_enabled(context, &updated).await;
                }
                summary.updated += 1;
            }
            Err(e) => {
                summary.unchanged += 1;
                tracing::error!(
                    endpoint_id = %registration.id,
                    error = %e,
                    "Failed updating endpoint during discovery"
                );
            }
        }
    }

    async fn add_one(
        &self,
        context: &OperationContext,
        observed: &EndpointRegistration,
        summary: &mut ReconcileSummary,
    ) {
        let mut registration = observed.clone();
        registration.enable();

        match self.store.upsert(registration.clone()).await {
            Ok(()) => {
                self.notify_new(context, &registration).await;
                self.notify_enabled(context, &registration).await;
                summary.added += 1;
            }
            Err(e) => {
                summary.unchanged += 1;
                tracing::error!(
                    endpoint_id = %registration.id,
                    error = %e,
                    "Failed adding endpoint from discovery"
                );
            }
        }
    }

    async fn disable_and_notify(
        &self,
        context: &OperationContext,
        registration: &EndpointRegistration,
    ) -> Result<(), StoreError> {
        let mut disabled = registration.clone();
        disabled.disable(Utc::now());
        self.store.upsert(disabled.clone()).await?;
        self.notify_disabled(context, &disabled).await;
        Ok(())
    }

    async fn delete_and_notify(
        &self,
        context: &OperationContext,
        registration: &EndpointRegistration,
    ) -> Result<(), StoreError> {
        self.store.delete(&registration.id).await?;
        self.notify_deleted(context, registration).await;
        Ok(())
    }

    // =========================================================================
    // Event emission
    // =========================================================================

    async fn notify_new(&self, context: &OperationContext, endpoint: &EndpointRegistration) {
        self.broker
            .notify_all(|listener| {
                let context = context.clone();
                let endpoint = endpoint.clone();
                async move { listener.on_endpoint_new(&context, &endpoint).await }
            })
            .await;
    }

    async fn notify_updated(&self, context: &OperationContext, endpoint: &EndpointRegistration) {
        self.broker
            .notify_all(|listener| {
                let context = context.clone();
                let endpoint = endpoint.clone();
                async move { listener.on_endpoint_updated(&context, &endpoint).await }
            })
            .await;
    }

    async fn notify_enabled(&self, context: &OperationContext, endpoint: &EndpointRegistration) {
        self.broker
            .notify_all(|listener| {
                let context = context.clone();
                let endpoint = endpoint.clone();
                async move { listener.on_endpoint_enabled(&context, &endpoint).await }
            })
            .await;
    }

    async fn notify_disabled(&self, context: &OperationContext, endpoint: &EndpointRegistration) {
        self.broker
            .notify_all(|listener| {
                let context = context.clone();
                let endpoint = endpoint.clone();
                async move { listener.on_endpoint_disabled(&context, &endpoint).await }
            })
            .await;
    }

    async fn notify_deleted(&self, context: &OperationContext, endpoint: &EndpointRegistration) {
        self.broker
            .notify_all(|listener| {
                let context = context.clone();
                let endpoint = endpoint.clone();
                async move { listener.on_endpoint_deleted(&context, &endpoint).await }
            })
            .await;
    }
}

impl std::fmt::Debug for EndpointReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointReconciler").finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRegistrationStore;
    use tether_core::types::SecurityMode;

    fn observed(url: &str, discoverer: &str) -> EndpointRegistration {
        EndpointRegistration::new(
            format!("ep-{}", url.trim_start_matches("opc.tcp://")),
            "app-1",
            url,
            SecurityMode::SignAndEncrypt,
            "policy",
        )
        .with_discoverer(discoverer)
    }

    fn reconciler() -> (EndpointReconciler, Arc<InMemoryRegistrationStore>) {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let broker = Arc::new(RegistryEventBroker::new());
        (EndpointReconciler::new(store.clone(), broker), store)
    }

    #[tokio::test]
    async fn test_register_only_skips_removals() {
        let (reconciler, store) = reconciler();
        let context = OperationContext::anonymous();

        let first = reconciler
            .process_discovery_results(
                &context,
                vec![observed("opc.tcp://h1", "d1")],
                &ReconcileOptions::new("d1", "app-1"),
            )
            .await
            .unwrap();
        assert_eq!(first.added, 1);

        // Nothing re-discovered, but register_only leaves h1 alone
        let second = reconciler
            .process_discovery_results(
                &context,
                vec![observed("opc.tcp://h2", "d1")],
                &ReconcileOptions::new("d1", "app-1").register_only(),
            )
            .await
            .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.removed, 0);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| !r.is_disabled()));
    }

    #[tokio::test]
    async fn test_duplicate_identity_in_batch_last_wins() {
        let (reconciler, store) = reconciler();
        let context = OperationContext::anonymous();

        let older = observed("opc.tcp://h1", "d1").with_certificate_thumbprint("aa");
        let newer = observed("opc.tcp://h1", "d1").with_certificate_thumbprint("bb");

        let summary = reconciler
            .process_discovery_results(
                &context,
                vec![older, newer],
                &ReconcileOptions::new("d1", "app-1"),
            )
            .await
            .unwrap();

        assert_eq!(summary.added, 1);
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].certificate_thumbprint.as_deref(), Some("bb"));
    }

    #[tokio::test]
    async fn test_summary_has_changes() {
        let summary = ReconcileSummary::default();
        assert!(!summary.has_changes());

        let summary = ReconcileSummary {
            added: 1,
            ..Default::default()
        };
        assert!(summary.has_changes());
    }
}
