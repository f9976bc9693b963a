// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared test utilities: mocks, builders, and fixtures.

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::{RegistrationBuilder, DEFAULT_POLICY};
pub use fixtures::{
    fast_retry, init_tracing, reconciler_fixture, supervisor_fixture, wait_until,
    ReconcilerFixture, SupervisorFixture,
};
pub use mocks::{CollectingListener, EventKind, FlakyStore, MockConnectionOpener, OpenScript};
