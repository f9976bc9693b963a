// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Mock implementations for testing tether components in isolation.
//!
//! ## Design Principles
//!
//! - Configurable behavior for different test scenarios
//! - Recording of interactions for verification
//! - Thread-safe for concurrent testing
//! - Easy to set up error injection

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use tether_core::connection::{ConnectionOpener, EndpointConnection};
use tether_core::error::{
    ConnectError, ConnectResult, ListenerError, ListenerResult, StoreError, StoreResult,
};
use tether_core::events::{OperationContext, RegistryListener};
use tether_core::registration::EndpointRegistration;
use tether_core::store::RegistrationStore;
use tether_core::types::{ApplicationId, EndpointId, Secret};
use tether_registry::InMemoryRegistrationStore;

// =============================================================================
// Mock Connection Opener
// =============================================================================

/// Scripted behavior for one endpoint's open attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenScript {
    /// Every attempt succeeds.
    Succeed,
    /// The first `n` attempts fail transiently, then attempts succeed.
    FailThenSucceed(u32),
    /// Every attempt fails transiently.
    AlwaysTransient,
    /// Every attempt is rejected as unauthorized.
    Unauthorized,
    /// Every attempt reports the endpoint entity as gone.
    NotFound,
}

#[derive(Default)]
struct EndpointRecord {
    attempts: u64,
    open_times: Vec<Instant>,
    close_count: Arc<AtomicU64>,
    drop_signal: Arc<Notify>,
}

/// A scriptable connection opener that records every interaction.
#[derive(Default)]
pub struct MockConnectionOpener {
    scripts: Mutex<HashMap<EndpointId, OpenScript>>,
    records: Mutex<HashMap<EndpointId, EndpointRecord>>,
}

impl MockConnectionOpener {
    /// Creates an opener where every endpoint succeeds by default.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripts the open behavior for an endpoint.
    pub fn script(&self, endpoint_id: impl Into<EndpointId>, script: OpenScript) {
        self.scripts.lock().insert(endpoint_id.into(), script);
    }

    /// Returns the number of open attempts made for an endpoint.
    pub fn attempts(&self, endpoint_id: &EndpointId) -> u64 {
        self.records
            .lock()
            .get(endpoint_id)
            .map(|r| r.attempts)
            .unwrap_or(0)
    }

    /// Returns the instants at which open was attempted for an endpoint.
    pub fn open_times(&self, endpoint_id: &EndpointId) -> Vec<Instant> {
        self.records
            .lock()
            .get(endpoint_id)
            .map(|r| r.open_times.clone())
            .unwrap_or_default()
    }

    /// Returns how many connections for the endpoint have been closed.
    pub fn close_count(&self, endpoint_id: &EndpointId) -> u64 {
        self.records
            .lock()
            .get(endpoint_id)
            .map(|r| r.close_count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Simulates a link drop on the endpoint's current connection.
    pub fn trigger_disconnect(&self, endpoint_id: &EndpointId) {
        let signal = {
            let mut records = self.records.lock();
            records.entry(endpoint_id.clone()).or_default().drop_signal.clone()
        };
        signal.notify_one();
    }
}

#[async_trait]
impl ConnectionOpener for MockConnectionOpener {
    async fn open(
        &self,
        endpoint: &EndpointRegistration,
        _secret: &Secret,
    ) -> ConnectResult<Box<dyn EndpointConnection>> {
        let endpoint_id = endpoint.id.clone();
        let script = self
            .scripts
            .lock()
            .get(&endpoint_id)
            .copied()
            .unwrap_or(OpenScript::Succeed);

        let (attempt, close_count, drop_signal) = {
            let mut records = self.records.lock();
            let record = records.entry(endpoint_id.clone()).or_default();
            record.attempts += 1;
            record.open_times.push(Instant::now());
            (
                record.attempts,
                record.close_count.clone(),
                record.drop_signal.clone(),
            )
        };

        let connect = || -> Box<dyn EndpointConnection> {
            Box::new(MockConnection {
                close_count,
                drop_signal,
            })
        };

        match script {
            OpenScript::Succeed => Ok(connect()),
            OpenScript::FailThenSucceed(n) if attempt <= n as u64 => {
                Err(ConnectError::transient("scripted transient failure"))
            }
            OpenScript::FailThenSucceed(_) => Ok(connect()),
            OpenScript::AlwaysTransient => {
                Err(ConnectError::transient("scripted transient failure"))
            }
            OpenScript::Unauthorized => Err(ConnectError::unauthorized(endpoint_id)),
            OpenScript::NotFound => Err(ConnectError::not_found(endpoint_id)),
        }
    }
}

/// A mock connection that stays up until closed or dropped by the test.
struct MockConnection {
    close_count: Arc<AtomicU64>,
    drop_signal: Arc<Notify>,
}

#[async_trait]
impl EndpointConnection for MockConnection {
    async fn disconnected(&mut self) -> ConnectError {
        self.drop_signal.notified().await;
        ConnectError::transient("link dropped")
    }

    async fn close(self: Box<Self>) -> ConnectResult<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Collecting Listener
// =============================================================================

/// The kind of registry event a listener observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `on_endpoint_new`
    New,
    /// `on_endpoint_updated`
    Updated,
    /// `on_endpoint_enabled`
    Enabled,
    /// `on_endpoint_disabled`
    Disabled,
    /// `on_endpoint_deleted`
    Deleted,
}

/// A listener that records every event it receives, in order.
pub struct CollectingListener {
    name: String,
    events: Mutex<Vec<(EventKind, EndpointId)>>,
    fail_all: bool,
}

impl CollectingListener {
    /// Creates a recording listener.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            fail_all: false,
        })
    }

    /// Creates a listener that records and then fails every delivery.
    pub fn failing(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            events: Mutex::new(Vec::new()),
            fail_all: true,
        })
    }

    /// Returns all recorded events in delivery order.
    pub fn events(&self) -> Vec<(EventKind, EndpointId)> {
        self.events.lock().clone()
    }

    /// Returns the event kinds recorded for one endpoint, in order.
    pub fn kinds_for(&self, endpoint_id: &EndpointId) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|(_, id)| id == endpoint_id)
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Returns how many events of a kind were recorded.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    /// Clears recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, kind: EventKind, endpoint: &EndpointRegistration) -> ListenerResult<()> {
        self.events.lock().push((kind, endpoint.id.clone()));
        if self.fail_all {
            Err(ListenerError::new("scripted listener failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryListener for CollectingListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_endpoint_new(
        &self,
        _context: &OperationContext,
        endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        self.record(EventKind::New, endpoint)
    }

    async fn on_endpoint_updated(
        &self,
        _context: &OperationContext,
        endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        self.record(EventKind::Updated, endpoint)
    }

    async fn on_endpoint_enabled(
        &self,
        _context: &OperationContext,
        endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        self.record(EventKind::Enabled, endpoint)
    }

    async fn on_endpoint_disabled(
        &self,
        _context: &OperationContext,
        endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        self.record(EventKind::Disabled, endpoint)
    }

    async fn on_endpoint_deleted(
        &self,
        _context: &OperationContext,
        endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        self.record(EventKind::Deleted, endpoint)
    }
}

// =============================================================================
// Flaky Store
// =============================================================================

/// A store wrapper that injects backend failures for selected endpoints.
pub struct FlakyStore {
    inner: Arc<InMemoryRegistrationStore>,
    fail_upsert: Mutex<HashSet<EndpointId>>,
    fail_delete: Mutex<HashSet<EndpointId>>,
}

impl FlakyStore {
    /// Wraps an in-memory store.
    pub fn new(inner: Arc<InMemoryRegistrationStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_upsert: Mutex::new(HashSet::new()),
            fail_delete: Mutex::new(HashSet::new()),
        })
    }

    /// Makes upserts of the given endpoint fail.
    pub fn fail_upsert_for(&self, endpoint_id: impl Into<EndpointId>) {
        self.fail_upsert.lock().insert(endpoint_id.into());
    }

    /// Makes deletes of the given endpoint fail.
    pub fn fail_delete_for(&self, endpoint_id: impl Into<EndpointId>) {
        self.fail_delete.lock().insert(endpoint_id.into());
    }
}

#[async_trait]
impl RegistrationStore for FlakyStore {
    async fn get(&self, endpoint_id: &EndpointId) -> StoreResult<EndpointRegistration> {
        self.inner.get(endpoint_id).await
    }

    async fn upsert(&self, registration: EndpointRegistration) -> StoreResult<()> {
        if self.fail_upsert.lock().contains(&registration.id) {
            return Err(StoreError::backend("injected upsert failure"));
        }
        self.inner.upsert(registration).await
    }

    async fn delete(&self, endpoint_id: &EndpointId) -> StoreResult<()> {
        if self.fail_delete.lock().contains(endpoint_id) {
            return Err(StoreError::backend("injected delete failure"));
        }
        self.inner.delete(endpoint_id).await
    }

    async fn query_application(
        &self,
        application_id: &ApplicationId,
        include_deleted: bool,
    ) -> StoreResult<Vec<EndpointRegistration>> {
        self.inner
            .query_application(application_id, include_deleted)
            .await
    }
}
