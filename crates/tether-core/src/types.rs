// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for tether.
//!
//! This module provides the identifier newtypes and small value types shared
//! by the supervision and registry components.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// A unique identifier for a registered endpoint.
///
/// Endpoint IDs are stable across restarts and unique within a registry.
///
/// # Examples
///
/// ```
/// use tether_core::types::EndpointId;
///
/// let id = EndpointId::new("endpoint-001");
/// assert_eq!(id.as_str(), "endpoint-001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    /// Creates a new endpoint ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A unique identifier for an application (the server program exposing
/// one or more endpoints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Creates a new application ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ApplicationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ApplicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A unique identifier for a discoverer (the edge agent that scans the
/// network and reports observed endpoints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscovererId(String);

impl DiscovererId {
    /// Creates a new discoverer ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DiscovererId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DiscovererId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DiscovererId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DiscovererId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Security
// =============================================================================

/// Message security mode of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No message security.
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityMode::None => write!(f, "none"),
            SecurityMode::Sign => write!(f, "sign"),
            SecurityMode::SignAndEncrypt => write!(f, "sign_and_encrypt"),
        }
    }
}

// =============================================================================
// Activation State
// =============================================================================

/// Activation state of a supervised endpoint.
///
/// The state moves `Deactivated → Activated → ActivatedAndConnected` and
/// drops back to `Activated` whenever the underlying connection is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ActivationState {
    /// Not activated; no connection host exists.
    Deactivated = 0,
    /// Activated; a connection host exists but the link is not up.
    Activated = 1,
    /// Activated and the connection is currently established.
    ActivatedAndConnected = 2,
}

impl ActivationState {
    /// Returns the state as its `u8` representation, suitable for storage
    /// in an atomic.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a `u8` representation back into a state.
    ///
    /// Unknown values map to `Deactivated`.
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ActivationState::Activated,
            2 => ActivationState::ActivatedAndConnected,
            _ => ActivationState::Deactivated,
        }
    }

    /// Returns `true` if the endpoint is activated (connected or not).
    #[inline]
    pub fn is_activated(self) -> bool {
        !matches!(self, ActivationState::Deactivated)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationState::Deactivated => write!(f, "deactivated"),
            ActivationState::Activated => write!(f, "activated"),
            ActivationState::ActivatedAndConnected => write!(f, "activated_and_connected"),
        }
    }
}

// =============================================================================
// Secret
// =============================================================================

/// A credential secret whose value is redacted from `Debug` and `Display`
/// output.
///
/// # Examples
///
/// ```
/// use tether_core::types::Secret;
///
/// let secret = Secret::new("hunter2");
/// assert_eq!(secret.expose(), "hunter2");
/// assert_eq!(format!("{:?}", secret), "Secret(****)");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Creates a new secret.
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    ///
    /// Call sites should be limited to the point where the credential is
    /// handed to the connection opener.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the secret is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****")
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id() {
        let id = EndpointId::new("ep-1");
        assert_eq!(id.as_str(), "ep-1");
        assert_eq!(id.to_string(), "ep-1");
        assert_eq!(EndpointId::from("ep-1"), id);
    }

    #[test]
    fn test_activation_state_roundtrip() {
        for state in [
            ActivationState::Deactivated,
            ActivationState::Activated,
            ActivationState::ActivatedAndConnected,
        ] {
            assert_eq!(ActivationState::from_u8(state.as_u8()), state);
        }

        // Unknown discriminants fall back to deactivated
        assert_eq!(ActivationState::from_u8(42), ActivationState::Deactivated);
    }

    #[test]
    fn test_activation_state_predicates() {
        assert!(!ActivationState::Deactivated.is_activated());
        assert!(ActivationState::Activated.is_activated());
        assert!(ActivationState::ActivatedAndConnected.is_activated());
    }

    #[test]
    fn test_secret_redaction() {
        let secret = Secret::new("super-secret");
        assert_eq!(secret.expose(), "super-secret");
        assert_eq!(format!("{:?}", secret), "Secret(****)");
        assert_eq!(format!("{}", secret), "****");
    }

    #[test]
    fn test_security_mode_serialization() {
        let json = serde_json::to_string(&SecurityMode::SignAndEncrypt).unwrap();
        assert_eq!(json, "\"sign_and_encrypt\"");

        let parsed: SecurityMode = serde_json::from_str("\"sign\"").unwrap();
        assert_eq!(parsed, SecurityMode::Sign);
    }
}
