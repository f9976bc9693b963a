// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builder patterns for constructing test registrations with sensible
//! defaults.

use chrono::Utc;

use tether_core::registration::EndpointRegistration;
use tether_core::types::SecurityMode;

/// Default security policy URI used by test registrations.
pub const DEFAULT_POLICY: &str = "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256";

// =============================================================================
// Registration Builder
// =============================================================================

/// Builder for endpoint registrations with sensible defaults.
#[derive(Debug, Clone)]
pub struct RegistrationBuilder {
    id: String,
    application_id: String,
    endpoint_url: String,
    security_mode: SecurityMode,
    security_policy: String,
    security_level: Option<i32>,
    certificate_thumbprint: Option<String>,
    site_id: Option<String>,
    discoverer_id: Option<String>,
    disabled: bool,
}

impl Default for RegistrationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationBuilder {
    /// Creates a builder with default field values.
    pub fn new() -> Self {
        Self {
            id: "ep-1".to_string(),
            application_id: "app-1".to_string(),
            endpoint_url: "opc.tcp://h1:4840".to_string(),
            security_mode: SecurityMode::SignAndEncrypt,
            security_policy: DEFAULT_POLICY.to_string(),
            security_level: None,
            certificate_thumbprint: None,
            site_id: None,
            discoverer_id: None,
            disabled: false,
        }
    }

    /// Sets the registration ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the application ID.
    pub fn application(mut self, id: impl Into<String>) -> Self {
        self.application_id = id.into();
        self
    }

    /// Sets the endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    /// Sets the security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Sets the security policy URI.
    pub fn security_policy(mut self, policy: impl Into<String>) -> Self {
        self.security_policy = policy.into();
        self
    }

    /// Sets the security level.
    pub fn security_level(mut self, level: i32) -> Self {
        self.security_level = Some(level);
        self
    }

    /// Sets the certificate thumbprint.
    pub fn thumbprint(mut self, thumbprint: impl Into<String>) -> Self {
        self.certificate_thumbprint = Some(thumbprint.into());
        self
    }

    /// Sets the site ID.
    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.site_id = Some(site.into());
        self
    }

    /// Sets the owning discoverer.
    pub fn discoverer(mut self, discoverer: impl Into<String>) -> Self {
        self.discoverer_id = Some(discoverer.into());
        self
    }

    /// Marks the registration disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Builds the registration.
    pub fn build(self) -> EndpointRegistration {
        let mut registration = EndpointRegistration::new(
            self.id,
            self.application_id,
            self.endpoint_url,
            self.security_mode,
            self.security_policy,
        );
        if let Some(level) = self.security_level {
            registration = registration.with_security_level(level);
        }
        if let Some(thumbprint) = self.certificate_thumbprint {
            registration = registration.with_certificate_thumbprint(thumbprint);
        }
        if let Some(site) = self.site_id {
            registration = registration.with_site_id(site);
        }
        if let Some(discoverer) = self.discoverer_id {
            registration = registration.with_discoverer(discoverer);
        }
        if self.disabled {
            registration.disable(Utc::now());
        }
        registration
    }
}
