// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint registration records and logical identity.
//!
//! A registration is the persisted record of one reachable endpoint. Two
//! registrations describe *the same endpoint* when their [`EndpointIdentity`]
//! matches, even if observable fields (certificate thumbprint, security
//! level, site) differ; identity matching is what distinguishes an update
//! from an add/remove pair during reconciliation.
//!
//! Registrations are soft-deleted: a `not_seen_since` timestamp marks the
//! record disabled while keeping its history. At most one non-deleted
//! registration exists per logical identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ApplicationId, DiscovererId, EndpointId, SecurityMode};

// =============================================================================
// Endpoint Identity
// =============================================================================

/// The logical identity of an endpoint registration.
///
/// Identity is the tuple (lowercased endpoint URL, application id, security
/// policy, security mode). It deliberately excludes the discoverer id and
/// all drift-prone fields: a re-discovery of the same endpoint by any
/// discoverer, with a rotated certificate, still matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointIdentity {
    /// Lowercased endpoint URL.
    pub endpoint_url: String,
    /// Application the endpoint belongs to.
    pub application_id: ApplicationId,
    /// Security policy URI.
    pub security_policy: String,
    /// Message security mode.
    pub security_mode: SecurityMode,
}

impl fmt::Display for EndpointIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({}, {})",
            self.endpoint_url, self.application_id, self.security_mode, self.security_policy
        )
    }
}

// =============================================================================
// Endpoint Registration
// =============================================================================

/// A persisted endpoint registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRegistration {
    /// Unique registration ID.
    pub id: EndpointId,

    /// Application the endpoint belongs to.
    pub application_id: ApplicationId,

    /// Endpoint URL as reported by discovery (original casing preserved).
    pub endpoint_url: String,

    /// Message security mode.
    pub security_mode: SecurityMode,

    /// Security policy URI.
    pub security_policy: String,

    /// Relative security level reported by the server, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_level: Option<i32>,

    /// Thumbprint of the server certificate observed at discovery time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_thumbprint: Option<String>,

    /// Site or gateway the endpoint was discovered in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,

    /// Discoverer that owns this registration. `None` means unowned, e.g.
    /// a manually registered endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discoverer_id: Option<DiscovererId>,

    /// Soft-delete marker. Set when the endpoint stopped being seen by its
    /// discoverer; `None` means the registration is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_seen_since: Option<DateTime<Utc>>,
}

impl EndpointRegistration {
    /// Creates a new enabled registration with the required fields.
    pub fn new(
        id: impl Into<EndpointId>,
        application_id: impl Into<ApplicationId>,
        endpoint_url: impl Into<String>,
        security_mode: SecurityMode,
        security_policy: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            application_id: application_id.into(),
            endpoint_url: endpoint_url.into(),
            security_mode,
            security_policy: security_policy.into(),
            security_level: None,
            certificate_thumbprint: None,
            site_id: None,
            discoverer_id: None,
            not_seen_since: None,
        }
    }

    /// Sets the security level.
    pub fn with_security_level(mut self, level: i32) -> Self {
        self.security_level = Some(level);
        self
    }

    /// Sets the certificate thumbprint.
    pub fn with_certificate_thumbprint(mut self, thumbprint: impl Into<String>) -> Self {
        self.certificate_thumbprint = Some(thumbprint.into());
        self
    }

    /// Sets the site ID.
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Sets the owning discoverer.
    pub fn with_discoverer(mut self, discoverer_id: impl Into<DiscovererId>) -> Self {
        self.discoverer_id = Some(discoverer_id.into());
        self
    }

    /// Returns the logical identity of this registration.
    pub fn identity(&self) -> EndpointIdentity {
        EndpointIdentity {
            endpoint_url: self.endpoint_url.to_lowercase(),
            application_id: self.application_id.clone(),
            security_policy: self.security_policy.clone(),
            security_mode: self.security_mode,
        }
    }

    /// Returns `true` if both registrations describe the same endpoint.
    pub fn same_endpoint(&self, other: &EndpointRegistration) -> bool {
        self.identity() == other.identity()
    }

    /// Returns `true` if the registration is disabled (soft-deleted).
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.not_seen_since.is_some()
    }

    /// Marks the registration disabled as of `now`.
    pub fn disable(&mut self, now: DateTime<Utc>) {
        self.not_seen_since = Some(now);
    }

    /// Clears the soft-delete marker.
    pub fn enable(&mut self) {
        self.not_seen_since = None;
    }

    /// Returns `true` if `observed` carries different observable field
    /// values for the same logical endpoint.
    ///
    /// Only non-identity fields participate; identity differences mean the
    /// records are different endpoints altogether.
    pub fn fields_differ(&self, observed: &EndpointRegistration) -> bool {
        self.certificate_thumbprint != observed.certificate_thumbprint
            || self.security_level != observed.security_level
            || self.site_id != observed.site_id
            || self.discoverer_id != observed.discoverer_id
    }

    /// Replaces this registration's observable fields with freshly observed
    /// values and clears the soft-delete marker.
    ///
    /// The registration ID and identity fields are kept so the persisted
    /// record is updated in place.
    pub fn absorb(&mut self, observed: &EndpointRegistration) {
        self.certificate_thumbprint = observed.certificate_thumbprint.clone();
        self.security_level = observed.security_level;
        self.site_id = observed.site_id.clone();
        self.discoverer_id = observed.discoverer_id.clone();
        self.not_seen_since = None;
    }

    /// Returns `true` if this registration is owned by the given discoverer.
    pub fn is_owned_by(&self, discoverer_id: &DiscovererId) -> bool {
        self.discoverer_id.as_ref() == Some(discoverer_id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(url: &str) -> EndpointRegistration {
        EndpointRegistration::new(
            "ep-1",
            "app-1",
            url,
            SecurityMode::SignAndEncrypt,
            "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
        )
    }

    #[test]
    fn test_identity_is_case_insensitive_on_url() {
        let a = registration("opc.tcp://Host-A:4840/UA");
        let b = registration("opc.tcp://host-a:4840/ua");
        assert!(a.same_endpoint(&b));
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_identity_excludes_discoverer_and_thumbprint() {
        let a = registration("opc.tcp://h1").with_discoverer("d1").with_certificate_thumbprint("aa");
        let b = registration("opc.tcp://h1").with_discoverer("d2").with_certificate_thumbprint("bb");
        assert!(a.same_endpoint(&b));
    }

    #[test]
    fn test_identity_distinguishes_security_mode() {
        let a = registration("opc.tcp://h1");
        let mut b = registration("opc.tcp://h1");
        b.security_mode = SecurityMode::Sign;
        assert!(!a.same_endpoint(&b));
    }

    #[test]
    fn test_fields_differ_detects_thumbprint_drift() {
        let a = registration("opc.tcp://h1").with_certificate_thumbprint("aa");
        let b = registration("opc.tcp://h1").with_certificate_thumbprint("bb");
        assert!(a.fields_differ(&b));

        let c = registration("opc.tcp://h1").with_certificate_thumbprint("aa");
        assert!(!a.fields_differ(&c));
    }

    #[test]
    fn test_absorb_clears_soft_delete_and_copies_fields() {
        let mut existing = registration("opc.tcp://h1").with_discoverer("d1");
        existing.disable(Utc::now());
        assert!(existing.is_disabled());

        let observed = registration("opc.tcp://h1")
            .with_discoverer("d1")
            .with_certificate_thumbprint("cc")
            .with_security_level(12);
        existing.absorb(&observed);

        assert!(!existing.is_disabled());
        assert_eq!(existing.certificate_thumbprint.as_deref(), Some("cc"));
        assert_eq!(existing.security_level, Some(12));
        // Identity fields are untouched
        assert_eq!(existing.id, EndpointId::new("ep-1"));
    }

    #[test]
    fn test_ownership() {
        let owned = registration("opc.tcp://h1").with_discoverer("d1");
        assert!(owned.is_owned_by(&DiscovererId::new("d1")));
        assert!(!owned.is_owned_by(&DiscovererId::new("d2")));

        let unowned = registration("opc.tcp://h1");
        assert!(!unowned.is_owned_by(&DiscovererId::new("d1")));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let reg = registration("opc.tcp://h1").with_discoverer("d1").with_site_id("factory-2");
        let json = serde_json::to_string(&reg).unwrap();
        let parsed: EndpointRegistration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reg);
        // Absent optional fields are omitted entirely
        assert!(!json.contains("not_seen_since"));
    }
}
