//! vpsfleet-test-utils - test doubles for the provisioning core
//!
//! Provides an in-memory vendor backend with real asynchronous job timing,
//! catalog fixtures matching the provider's alias tables, injectable
//! id/address generation, and scripted port probes.

pub mod fake;
pub mod fixtures;
pub mod generators;
pub mod probes;

pub use fake::FakeVendor;
