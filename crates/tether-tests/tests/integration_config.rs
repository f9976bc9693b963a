// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration tests wiring loaded configuration into the supervisor.

use std::fs;
use std::io::Write;
use std::time::Duration;

use tether_config::ConfigLoader;
use tether_core::error::ConnectError;
use tether_core::types::{EndpointId, Secret};
use tether_tests::common::{supervisor_fixture, OpenScript, RegistrationBuilder};

#[test]
fn loaded_config_produces_expected_retry_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.yaml");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"supervisor:\n  max_retry_count: 4\n  base_retry_delay_ms: 250\n")
        .unwrap();

    let config = ConfigLoader::new()
        .with_env_overrides(false)
        .load(&path)
        .unwrap();

    let policy = config.supervisor.retry_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
    assert_eq!(config.supervisor.connect_timeout(), None);
}

#[tokio::test(start_paused = true)]
async fn configured_ceiling_drives_the_host_retry_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"[supervisor]\nmax_retry_count = 2\nbase_retry_delay_ms = 50\n")
        .unwrap();

    let config = ConfigLoader::new()
        .with_env_overrides(false)
        .load(&path)
        .unwrap();

    let fixture = supervisor_fixture(
        vec![RegistrationBuilder::new().id("ep-1").build()],
        config.supervisor.retry_policy(),
    )
    .await;
    fixture.opener.script("ep-1", OpenScript::AlwaysTransient);

    let error = fixture
        .supervisor
        .activate(EndpointId::new("ep-1"), Secret::new("s"))
        .await
        .unwrap_err();

    assert!(matches!(error, ConnectError::RetriesExhausted { attempts: 3 }));
    assert_eq!(fixture.opener.attempts(&EndpointId::new("ep-1")), 3);
}
