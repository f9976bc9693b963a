// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-wired component assemblies for integration tests.

use std::sync::Arc;
use std::time::Duration;

use tether_core::events::RegistryEventBroker;
use tether_core::registration::EndpointRegistration;
use tether_core::retry::RetryPolicy;
use tether_core::store::RegistrationStore;
use tether_registry::{EndpointReconciler, InMemoryRegistrationStore};
use tether_supervisor::ActivationSupervisor;

use super::mocks::{CollectingListener, MockConnectionOpener};

// =============================================================================
// Reconciler Fixture
// =============================================================================

/// A reconciler wired to an in-memory store and a recording listener.
pub struct ReconcilerFixture {
    /// The backing store.
    pub store: Arc<InMemoryRegistrationStore>,
    /// The event broker.
    pub broker: Arc<RegistryEventBroker>,
    /// Records every event the reconciler emits.
    pub listener: Arc<CollectingListener>,
    /// The reconciler under test.
    pub reconciler: EndpointReconciler,
}

/// Creates a reconciler fixture with the given registrations pre-seeded.
pub async fn reconciler_fixture(seed: Vec<EndpointRegistration>) -> ReconcilerFixture {
    let store = Arc::new(InMemoryRegistrationStore::new());
    for registration in seed {
        store.upsert(registration).await.expect("seeding store");
    }

    let broker = Arc::new(RegistryEventBroker::new());
    let listener = CollectingListener::new("collector");
    broker.register(listener.clone());

    let reconciler = EndpointReconciler::new(store.clone(), broker.clone());
    ReconcilerFixture {
        store,
        broker,
        listener,
        reconciler,
    }
}

// =============================================================================
// Supervisor Fixture
// =============================================================================

/// A supervisor wired to an in-memory store and a scriptable opener.
pub struct SupervisorFixture {
    /// The backing store.
    pub store: Arc<InMemoryRegistrationStore>,
    /// The scriptable, recording opener.
    pub opener: Arc<MockConnectionOpener>,
    /// The supervisor under test.
    pub supervisor: ActivationSupervisor,
}

/// Creates a supervisor fixture with the given registrations pre-seeded
/// and a fast retry policy suitable for paused-clock tests.
pub async fn supervisor_fixture(
    seed: Vec<EndpointRegistration>,
    retry: RetryPolicy,
) -> SupervisorFixture {
    let store = Arc::new(InMemoryRegistrationStore::new());
    for registration in seed {
        store.upsert(registration).await.expect("seeding store");
    }

    let opener = MockConnectionOpener::new();
    let supervisor =
        ActivationSupervisor::new(store.clone(), opener.clone()).with_retry_policy(retry);

    SupervisorFixture {
        store,
        opener,
        supervisor,
    }
}

/// A retry policy small enough to exercise the ceiling quickly.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(100))
}

// =============================================================================
// Tracing
// =============================================================================

/// Installs a tracing subscriber for the current test binary, honoring
/// `RUST_LOG`. Safe to call from multiple tests; only the first call wins.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Polling helper
// =============================================================================

/// Waits until `condition` holds, yielding so background tasks (and the
/// paused test clock) can make progress.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
