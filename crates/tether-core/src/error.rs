// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for tether.
//!
//! This module defines the error types shared across the supervision and
//! registry components:
//!
//! - Distinguishes terminal from transient connection failures
//! - Supports error chaining for traceability
//! - Supports structured logging via `error_type()` discriminators
//!
//! # Error Hierarchy
//!
//! ```text
//! TetherError (root)
//! ├── ConnectError   - Endpoint connection establishment and teardown
//! ├── StoreError     - Registration store operations
//! └── ListenerError  - Registry event listener failures
//! ```
//!
//! # Examples
//!
//! ```
//! use tether_core::error::ConnectError;
//!
//! let error = ConnectError::transient("socket reset by peer");
//! assert!(!error.is_terminal());
//!
//! let error = ConnectError::unauthorized("ep-1");
//! assert!(error.is_terminal());
//! ```

use thiserror::Error;

use crate::types::EndpointId;

// =============================================================================
// TetherError - Root Error Type
// =============================================================================

/// The root error type for tether.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Endpoint connection error.
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Registration store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Event listener error.
    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),
}

impl TetherError {
    /// Returns the error type as a string for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            TetherError::Connect(_) => "connect",
            TetherError::Store(_) => "store",
            TetherError::Listener(_) => "listener",
        }
    }
}

// =============================================================================
// ConnectError
// =============================================================================

/// Errors raised while establishing or supervising an endpoint connection.
///
/// The taxonomy drives the connection host's retry loop: `NotFound` and
/// `Unauthorized` are terminal and abort supervision immediately, while
/// `Transient` failures are retried with backoff until the configured
/// ceiling escalates them into `RetriesExhausted`.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The backing registration no longer exists.
    #[error("Endpoint registration not found: {endpoint_id}")]
    NotFound {
        /// The endpoint ID.
        endpoint_id: EndpointId,
    },

    /// The credential or secret was rejected.
    #[error("Unauthorized to connect endpoint '{endpoint_id}'")]
    Unauthorized {
        /// The endpoint ID.
        endpoint_id: EndpointId,
    },

    /// A transient failure: network blip, server restart, timeout.
    #[error("Transient connection failure: {message}")]
    Transient {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The retry ceiling was reached without a successful connection.
    #[error("Connection retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// Supervision was cancelled before the connection was established.
    #[error("Connection attempt cancelled")]
    Cancelled,
}

impl ConnectError {
    /// Creates a not-found error.
    pub fn not_found(endpoint_id: impl Into<EndpointId>) -> Self {
        Self::NotFound {
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(endpoint_id: impl Into<EndpointId>) -> Self {
        Self::Unauthorized {
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transient error with a source.
    pub fn transient_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a retries-exhausted error.
    pub fn retries_exhausted(attempts: u32) -> Self {
        Self::RetriesExhausted { attempts }
    }

    /// Returns `true` if this error terminates supervision (no retry).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectError::NotFound { .. }
                | ConnectError::Unauthorized { .. }
                | ConnectError::RetriesExhausted { .. }
        )
    }

    /// Returns `true` if this error should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectError::Transient { .. })
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConnectError::NotFound { .. } => "not_found",
            ConnectError::Unauthorized { .. } => "unauthorized",
            ConnectError::Transient { .. } => "transient",
            ConnectError::RetriesExhausted { .. } => "retries_exhausted",
            ConnectError::Cancelled => "cancelled",
        }
    }
}

impl Clone for ConnectError {
    fn clone(&self) -> Self {
        match self {
            ConnectError::NotFound { endpoint_id } => ConnectError::NotFound {
                endpoint_id: endpoint_id.clone(),
            },
            ConnectError::Unauthorized { endpoint_id } => ConnectError::Unauthorized {
                endpoint_id: endpoint_id.clone(),
            },
            ConnectError::Transient { message, .. } => ConnectError::Transient {
                message: message.clone(),
                source: None,
            },
            ConnectError::RetriesExhausted { attempts } => {
                ConnectError::RetriesExhausted { attempts: *attempts }
            }
            ConnectError::Cancelled => ConnectError::Cancelled,
        }
    }
}

// =============================================================================
// StoreError
// =============================================================================

/// Registration store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No registration exists with the given ID.
    #[error("Registration not found: {endpoint_id}")]
    NotFound {
        /// The endpoint ID.
        endpoint_id: EndpointId,
    },

    /// The backing store failed.
    #[error("Store backend error: {message}")]
    Backend {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(endpoint_id: impl Into<EndpointId>) -> Self {
        Self::NotFound {
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend error with a source.
    pub fn backend_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the error is a missing registration.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Backend { .. } => "backend",
        }
    }
}

// =============================================================================
// ListenerError
// =============================================================================

/// An error raised by a registry event listener.
///
/// Listener failures are always caught and logged by the event broker; this
/// type exists so listeners can report a descriptive reason.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ListenerError {
    /// Creates a new listener error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new listener error with a source.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with TetherError.
pub type TetherResult<T> = Result<T, TetherError>;

/// A Result type with ConnectError.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// A Result type with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// A Result type with ListenerError.
pub type ListenerResult<T> = Result<T, ListenerError>;

// =============================================================================
// Display helpers
// =============================================================================

/// Formats an error chain for log output, walking `source()` links.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_classification() {
        assert!(ConnectError::not_found("ep-1").is_terminal());
        assert!(ConnectError::unauthorized("ep-1").is_terminal());
        assert!(ConnectError::retries_exhausted(30).is_terminal());
        assert!(!ConnectError::transient("blip").is_terminal());
        assert!(!ConnectError::Cancelled.is_terminal());

        assert!(ConnectError::transient("blip").is_transient());
        assert!(!ConnectError::not_found("ep-1").is_transient());
    }

    #[test]
    fn test_connect_error_type() {
        assert_eq!(ConnectError::not_found("ep-1").error_type(), "not_found");
        assert_eq!(ConnectError::transient("x").error_type(), "transient");
        assert_eq!(ConnectError::Cancelled.error_type(), "cancelled");
    }

    #[test]
    fn test_connect_error_clone_drops_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let error = ConnectError::transient_with("socket reset", source);
        let cloned = error.clone();
        match cloned {
            ConnectError::Transient { message, source } => {
                assert_eq!(message, "socket reset");
                assert!(source.is_none());
            }
            _ => panic!("Expected Transient"),
        }
    }

    #[test]
    fn test_store_error() {
        let error = StoreError::not_found("ep-1");
        assert!(error.is_not_found());
        assert_eq!(error.error_type(), "not_found");

        let error = StoreError::backend("write conflict");
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_root_conversion() {
        let error: TetherError = ConnectError::transient("blip").into();
        assert_eq!(error.error_type(), "connect");

        let error: TetherError = StoreError::backend("down").into();
        assert_eq!(error.error_type(), "store");
    }

    #[test]
    fn test_error_chain_formatting() {
        let source = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let error = ConnectError::transient_with("open failed", source);
        let chain = error_chain(&error);
        assert!(chain.contains("open failed"));
        assert!(chain.contains("timed out"));
    }
}
