// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tether-tests
//!
//! Integration tests and shared test utilities for tether.
//!
//! The `common` module provides mocks (scriptable connection opener,
//! recording listener, failure-injecting store), builders, and pre-wired
//! fixtures used by the integration tests under `tests/`.

pub mod common;
