//! Shared helpers for provider integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use vpsfleet_provider::{AcquireOptions, ProviderConfig, ServerProvider};
use vpsfleet_test_utils::FakeVendor;

/// Fake backend plus a provider wired to it, with test defaults.
pub fn fake_provider() -> (Arc<FakeVendor>, ServerProvider) {
    init_tracing();
    let api = Arc::new(FakeVendor::new());
    let provider = ServerProvider::new(
        api.clone(),
        ProviderConfig {
            name: "test".to_string(),
            ssh_public_key: Some("ssh-ed25519 AAAATESTKEY".to_string()),
            ..ProviderConfig::default()
        },
    );
    (api, provider)
}

/// Acquisition options with a tight poll cadence so tests finish quickly.
pub fn fast() -> AcquireOptions {
    AcquireOptions {
        timeout: Some(Duration::from_secs(5)),
        interval: Some(Duration::from_millis(2)),
        ..AcquireOptions::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
