// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Activation supervisor.
//!
//! The supervisor owns the collection of [`EndpointConnectionHost`]
//! instances, keyed by endpoint ID. All map mutations and status reads are
//! serialized by a single async mutex; the hosts themselves run
//! independently and are never sequenced against each other.
//!
//! # Operations
//!
//! - [`ActivationSupervisor::activate`] spins up a host and waits for its
//!   started gate: the caller learns synchronously whether the endpoint
//!   could be connected at least once
//! - [`ActivationSupervisor::deactivate`] removes the map entry first, then
//!   stops the host outside the mutex so a slow teardown never blocks
//!   other operations
//! - [`ActivationSupervisor::attach`] / [`ActivationSupervisor::detach`]
//!   re-adopt already-activated endpoints across a process restart without
//!   the started gate
//! - [`ActivationSupervisor::shutdown`] stops every host concurrently,
//!   best-effort

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use tether_core::connection::ConnectionOpener;
use tether_core::error::ConnectResult;
use tether_core::retry::RetryPolicy;
use tether_core::store::RegistrationStore;
use tether_core::types::{ActivationState, EndpointId, Secret};

use crate::host::EndpointConnectionHost;

// =============================================================================
// Activation Status
// =============================================================================

/// Snapshot of one supervised endpoint's activation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationStatus {
    /// The endpoint ID.
    pub endpoint_id: EndpointId,
    /// The activation state at snapshot time.
    pub state: ActivationState,
}

// =============================================================================
// Activation Supervisor
// =============================================================================

/// Supervises activation of registered endpoints.
pub struct ActivationSupervisor {
    store: Arc<dyn RegistrationStore>,
    opener: Arc<dyn ConnectionOpener>,
    retry: RetryPolicy,
    connect_timeout: Option<Duration>,
    hosts: Mutex<HashMap<EndpointId, EndpointConnectionHost>>,
}

impl ActivationSupervisor {
    /// Creates a new supervisor with the default retry policy and no
    /// connect timeout.
    pub fn new(store: Arc<dyn RegistrationStore>, opener: Arc<dyn ConnectionOpener>) -> Self {
        Self {
            store,
            opener,
            retry: RetryPolicy::default(),
            connect_timeout: None,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the retry policy used by new hosts.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds each individual connect attempt.
    ///
    /// Off by default; a hanging opener then also hangs the activation
    /// caller.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Activates an endpoint and waits until the connection has been
    /// established at least once.
    ///
    /// A no-op if the endpoint is already activated and its host is
    /// running. On failure the classified error is returned and no entry
    /// remains in the supervisor.
    pub async fn activate(&self, endpoint_id: EndpointId, secret: Secret) -> ConnectResult<()> {
        let mut hosts = self.hosts.lock().await;

        if let Some(existing) = hosts.get(&endpoint_id) {
            if existing.is_running() {
                tracing::debug!(endpoint_id = %endpoint_id, "Endpoint already activated");
                return Ok(());
            }
            // Reap the terminated host before re-activating
            if let Some(stale) = hosts.remove(&endpoint_id) {
                stale.stop().await;
            }
        }

        let host = self.spawn_host(endpoint_id.clone(), secret);
        let entry = hosts.entry(endpoint_id.clone()).or_insert(host);
        let result = entry.wait_started().await;

        match result {
            Ok(()) => {
                tracing::info!(endpoint_id = %endpoint_id, "Endpoint activated");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    error = %error,
                    "Endpoint activation failed"
                );
                if let Some(host) = hosts.remove(&endpoint_id) {
                    host.stop().await;
                }
                Err(error)
            }
        }
    }

    /// Deactivates an endpoint.
    ///
    /// The map entry is removed first so status queries stop listing the
    /// endpoint immediately; the host teardown then runs outside the mutex.
    /// Deactivating an unknown endpoint is a no-op.
    pub async fn deactivate(&self, endpoint_id: &EndpointId) {
        let host = {
            let mut hosts = self.hosts.lock().await;
            hosts.remove(endpoint_id)
        };

        match host {
            Some(host) => {
                host.stop().await;
                tracing::info!(endpoint_id = %endpoint_id, "Endpoint deactivated");
            }
            None => {
                tracing::debug!(endpoint_id = %endpoint_id, "Endpoint was not activated");
            }
        }
    }

    /// Re-adopts an already-activated endpoint without waiting for the
    /// started gate, e.g. after a supervisor restart.
    pub async fn attach(&self, endpoint_id: EndpointId, secret: Secret) {
        let mut hosts = self.hosts.lock().await;

        if let Some(existing) = hosts.get(&endpoint_id) {
            if existing.is_running() {
                tracing::debug!(endpoint_id = %endpoint_id, "Endpoint already attached");
                return;
            }
            if let Some(stale) = hosts.remove(&endpoint_id) {
                stale.stop().await;
            }
        }

        let host = self.spawn_host(endpoint_id.clone(), secret);
        hosts.insert(endpoint_id.clone(), host);
        tracing::info!(endpoint_id = %endpoint_id, "Endpoint attached");
    }

    /// Forgets an endpoint's host, but only if it is no longer running.
    ///
    /// A still-running host is left in place for a later detach; forgetting
    /// a live connection would leak it.
    pub async fn detach(&self, endpoint_id: &EndpointId) {
        let mut hosts = self.hosts.lock().await;

        match hosts.get(endpoint_id) {
            Some(host) if host.is_running() => {
                tracing::debug!(
                    endpoint_id = %endpoint_id,
                    "Endpoint host still running, leaving for later detach"
                );
            }
            Some(_) => {
                if let Some(host) = hosts.remove(endpoint_id) {
                    host.stop().await;
                }
                tracing::info!(endpoint_id = %endpoint_id, "Endpoint detached");
            }
            None => {
                tracing::debug!(endpoint_id = %endpoint_id, "Endpoint was not attached");
            }
        }
    }

    /// Requests an intentional reconnect of an endpoint's connection.
    ///
    /// Returns `true` if a host was signalled.
    pub async fn reset(&self, endpoint_id: &EndpointId) -> bool {
        let hosts = self.hosts.lock().await;
        match hosts.get(endpoint_id) {
            Some(host) => {
                host.request_reset();
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot of all supervised endpoints and their states,
    /// sorted by endpoint ID.
    pub async fn status(&self) -> Vec<ActivationStatus> {
        let hosts = self.hosts.lock().await;
        let mut statuses: Vec<_> = hosts
            .values()
            .map(|host| ActivationStatus {
                endpoint_id: host.endpoint_id().clone(),
                state: host.state(),
            })
            .collect();
        statuses.sort_by(|a, b| a.endpoint_id.as_str().cmp(b.endpoint_id.as_str()));
        statuses
    }

    /// Stops and disposes every host concurrently.
    ///
    /// Individual host failures are logged and never abort the shutdown of
    /// siblings.
    pub async fn shutdown(&self) {
        let drained: Vec<(EndpointId, EndpointConnectionHost)> = {
            let mut hosts = self.hosts.lock().await;
            hosts.drain().collect()
        };

        let count = drained.len();
        futures::future::join_all(drained.into_iter().map(|(endpoint_id, host)| async move {
            tracing::debug!(endpoint_id = %endpoint_id, "Stopping endpoint host");
            host.stop().await;
        }))
        .await;

        tracing::info!(hosts = count, "Supervisor shutdown complete");
    }

    fn spawn_host(&self, endpoint_id: EndpointId, secret: Secret) -> EndpointConnectionHost {
        EndpointConnectionHost::spawn(
            endpoint_id,
            secret,
            self.store.clone(),
            self.opener.clone(),
            self.retry.clone(),
            self.connect_timeout,
        )
    }
}

impl std::fmt::Debug for ActivationSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationSupervisor")
            .field("retry", &self.retry)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tether_core::connection::EndpointConnection;
    use tether_core::error::{ConnectError, ConnectResult, StoreError, StoreResult};
    use tether_core::registration::EndpointRegistration;
    use tether_core::types::{ApplicationId, SecurityMode};

    // A connection that stays up until closed.
    struct SteadyConnection;

    #[async_trait]
    impl EndpointConnection for SteadyConnection {
        async fn disconnected(&mut self) -> ConnectError {
            std::future::pending().await
        }

        async fn close(self: Box<Self>) -> ConnectResult<()> {
            Ok(())
        }
    }

    struct SteadyOpener {
        opens: AtomicU64,
    }

    #[async_trait]
    impl ConnectionOpener for SteadyOpener {
        async fn open(
            &self,
            _endpoint: &EndpointRegistration,
            _secret: &Secret,
        ) -> ConnectResult<Box<dyn EndpointConnection>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(SteadyConnection))
        }
    }

    struct SingleEndpointStore {
        registration: EndpointRegistration,
    }

    #[async_trait]
    impl RegistrationStore for SingleEndpointStore {
        async fn get(&self, endpoint_id: &EndpointId) -> StoreResult<EndpointRegistration> {
            if endpoint_id == &self.registration.id {
                Ok(self.registration.clone())
            } else {
                Err(StoreError::not_found(endpoint_id.clone()))
            }
        }

        async fn upsert(&self, _registration: EndpointRegistration) -> StoreResult<()> {
            Ok(())
        }

        async fn delete(&self, _endpoint_id: &EndpointId) -> StoreResult<()> {
            Ok(())
        }

        async fn query_application(
            &self,
            _application_id: &ApplicationId,
            _include_deleted: bool,
        ) -> StoreResult<Vec<EndpointRegistration>> {
            Ok(vec![self.registration.clone()])
        }
    }

    fn supervisor() -> (ActivationSupervisor, Arc<SteadyOpener>) {
        let registration = EndpointRegistration::new(
            "ep-1",
            "app-1",
            "opc.tcp://h1:4840",
            SecurityMode::SignAndEncrypt,
            "policy",
        );
        let store = Arc::new(SingleEndpointStore { registration });
        let opener = Arc::new(SteadyOpener {
            opens: AtomicU64::new(0),
        });
        (ActivationSupervisor::new(store, opener.clone()), opener)
    }

    #[tokio::test]
    async fn test_activate_then_status_then_deactivate() {
        let (supervisor, opener) = supervisor();
        let id = EndpointId::new("ep-1");

        supervisor.activate(id.clone(), Secret::new("s")).await.unwrap();
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);

        let status = supervisor.status().await;
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].endpoint_id, id);
        assert_eq!(status[0].state, ActivationState::ActivatedAndConnected);

        supervisor.deactivate(&id).await;
        assert!(supervisor.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_activate_is_idempotent_while_running() {
        let (supervisor, opener) = supervisor();
        let id = EndpointId::new("ep-1");

        supervisor.activate(id.clone(), Secret::new("s")).await.unwrap();
        supervisor.activate(id.clone(), Secret::new("s")).await.unwrap();

        // Second call was a no-op: no new host, no new connection
        assert_eq!(opener.opens.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.status().await.len(), 1);
    }

    #[tokio::test]
    async fn test_activate_unknown_endpoint_fails_not_found() {
        let (supervisor, _) = supervisor();
        let error = supervisor
            .activate(EndpointId::new("missing"), Secret::new("s"))
            .await
            .unwrap_err();
        assert!(matches!(error, ConnectError::NotFound { .. }));
        // No entry remains after a failed activation
        assert!(supervisor.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_unknown_is_noop() {
        let (supervisor, _) = supervisor();
        supervisor.deactivate(&EndpointId::new("missing")).await;
    }

    #[tokio::test]
    async fn test_detach_leaves_running_host() {
        let (supervisor, _) = supervisor();
        let id = EndpointId::new("ep-1");

        supervisor.attach(id.clone(), Secret::new("s")).await;
        supervisor.detach(&id).await;

        // The host is still connecting/running, so detach must not remove it
        assert_eq!(supervisor.status().await.len(), 1);

        supervisor.shutdown().await;
        assert!(supervisor.status().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_signals_running_host() {
        let (supervisor, _) = supervisor();
        let id = EndpointId::new("ep-1");

        assert!(!supervisor.reset(&id).await);

        supervisor.activate(id.clone(), Secret::new("s")).await.unwrap();
        assert!(supervisor.reset(&id).await);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_hosts() {
        let registration_a = EndpointRegistration::new(
            "ep-1",
            "app-1",
            "opc.tcp://h1:4840",
            SecurityMode::SignAndEncrypt,
            "policy",
        );
        let store = Arc::new(SingleEndpointStore {
            registration: registration_a,
        });
        let opener = Arc::new(SteadyOpener {
            opens: AtomicU64::new(0),
        });
        let supervisor = ActivationSupervisor::new(store, opener);

        supervisor
            .activate(EndpointId::new("ep-1"), Secret::new("s"))
            .await
            .unwrap();
        supervisor.shutdown().await;

        assert!(supervisor.status().await.is_empty());
    }
}
