// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Registry event listeners and fan-out broker.
//!
//! Registry mutations (new/updated/enabled/disabled/deleted endpoint) are
//! published to zero or more listeners. Delivery is best-effort per
//! listener: a failing listener is logged and skipped, never aborting
//! delivery to the remaining listeners and never failing the operation
//! that triggered the event.
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::events::{RegistryEventBroker, OperationContext};
//!
//! let broker = RegistryEventBroker::new();
//! broker.register(listener);
//!
//! broker
//!     .notify_all(|l| {
//!         let ctx = ctx.clone();
//!         let endpoint = endpoint.clone();
//!         async move { l.on_endpoint_new(&ctx, &endpoint).await }
//!     })
//!     .await;
//! ```

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ListenerResult;
use crate::registration::EndpointRegistration;

// =============================================================================
// Operation Context
// =============================================================================

/// Context describing the operation that produced a registry event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authority that triggered the operation (a discoverer, an operator).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,
    /// Time the operation was performed.
    pub time: DateTime<Utc>,
}

impl OperationContext {
    /// Creates a context stamped with the current time.
    pub fn new(authority_id: impl Into<String>) -> Self {
        Self {
            authority_id: Some(authority_id.into()),
            time: Utc::now(),
        }
    }

    /// Creates an anonymous context stamped with the current time.
    pub fn anonymous() -> Self {
        Self {
            authority_id: None,
            time: Utc::now(),
        }
    }
}

// =============================================================================
// Registry Listener
// =============================================================================

/// A listener for endpoint registry events.
///
/// All methods default to a no-op so listeners only implement the events
/// they care about.
#[async_trait::async_trait]
pub trait RegistryListener: Send + Sync {
    /// Returns the listener name for logging.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// A previously unknown endpoint was registered.
    async fn on_endpoint_new(
        &self,
        _context: &OperationContext,
        _endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// An existing registration's observable fields changed.
    async fn on_endpoint_updated(
        &self,
        _context: &OperationContext,
        _endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// A registration became enabled.
    async fn on_endpoint_enabled(
        &self,
        _context: &OperationContext,
        _endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// A registration became disabled (soft-deleted).
    async fn on_endpoint_disabled(
        &self,
        _context: &OperationContext,
        _endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// A registration was permanently deleted.
    async fn on_endpoint_deleted(
        &self,
        _context: &OperationContext,
        _endpoint: &EndpointRegistration,
    ) -> ListenerResult<()> {
        Ok(())
    }
}

// =============================================================================
// Registry Event Broker
// =============================================================================

/// Fans registry events out to all registered listeners.
///
/// Registration and unregistration are safe to call concurrently with
/// notification; each notification pass operates on a stable snapshot of
/// the listener list.
pub struct RegistryEventBroker {
    listeners: RwLock<Vec<Arc<dyn RegistryListener>>>,
}

impl RegistryEventBroker {
    /// Creates a new broker with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Registers a listener.
    pub fn register(&self, listener: Arc<dyn RegistryListener>) {
        self.listeners.write().push(listener);
    }

    /// Removes all listeners with the given name.
    pub fn unregister(&self, name: &str) {
        self.listeners.write().retain(|l| l.name() != name);
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Invokes `action` against every registered listener.
    ///
    /// A failing listener is logged and skipped; the failure never reaches
    /// the caller.
    pub async fn notify_all<F, Fut>(&self, action: F)
    where
        F: Fn(Arc<dyn RegistryListener>) -> Fut,
        Fut: Future<Output = ListenerResult<()>>,
    {
        let listeners = self.listeners.read().clone();

        for listener in listeners {
            let name = listener.name().to_string();
            if let Err(e) = action(listener).await {
                tracing::warn!(listener = %name, error = %e, "Registry listener failed");
            }
        }
    }
}

impl Default for RegistryEventBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegistryEventBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let names: Vec<_> = listeners.iter().map(|l| l.name()).collect();
        f.debug_struct("RegistryEventBroker")
            .field("listeners", &names)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::types::SecurityMode;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingListener {
        name: &'static str,
        calls: AtomicU32,
        fail: bool,
    }

    impl CountingListener {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl RegistryListener for CountingListener {
        fn name(&self) -> &str {
            self.name
        }

        async fn on_endpoint_new(
            &self,
            _context: &OperationContext,
            _endpoint: &EndpointRegistration,
        ) -> ListenerResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ListenerError::new("listener down"))
            } else {
                Ok(())
            }
        }
    }

    fn endpoint() -> EndpointRegistration {
        EndpointRegistration::new(
            "ep-1",
            "app-1",
            "opc.tcp://h1",
            SecurityMode::SignAndEncrypt,
            "policy",
        )
    }

    async fn notify_new(broker: &RegistryEventBroker) {
        let ctx = OperationContext::anonymous();
        let ep = endpoint();
        broker
            .notify_all(|l| {
                let ctx = ctx.clone();
                let ep = ep.clone();
                async move { l.on_endpoint_new(&ctx, &ep).await }
            })
            .await;
    }

    #[tokio::test]
    async fn test_notify_reaches_all_listeners() {
        let broker = RegistryEventBroker::new();
        let a = CountingListener::new("a", false);
        let b = CountingListener::new("b", false);
        broker.register(a.clone());
        broker.register(b.clone());

        notify_new(&broker).await;

        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_block_others() {
        let broker = RegistryEventBroker::new();
        let failing = CountingListener::new("failing", true);
        let healthy = CountingListener::new("healthy", false);
        broker.register(failing.clone());
        broker.register(healthy.clone());

        // Must not panic or abort delivery
        notify_new(&broker).await;

        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unregister_by_name() {
        let broker = RegistryEventBroker::new();
        let a = CountingListener::new("a", false);
        let b = CountingListener::new("b", false);
        broker.register(a.clone());
        broker.register(b.clone());
        assert_eq!(broker.listener_count(), 2);

        broker.unregister("a");
        assert_eq!(broker.listener_count(), 1);

        notify_new(&broker).await;
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_broker_is_a_noop() {
        let broker = RegistryEventBroker::new();
        notify_new(&broker).await;
        assert_eq!(broker.listener_count(), 0);
    }
}
