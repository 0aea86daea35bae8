//! Injectable identifier and address generation
//!
//! The fake vendor mints server/disk/config/job ids and addresses through
//! these seams so tests can substitute their own sequences instead of
//! depending on hidden global counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of vendor-assigned identifiers.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Source of vendor-assigned network addresses.
pub trait AddressSource: Send + Sync {
    fn next_address(&self) -> String;
}

/// Monotonic numeric ids, matching the shape of real vendor ids.
pub struct CounterIds {
    next: AtomicU64,
}

impl CounterIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for CounterIds {
    fn default() -> Self {
        Self::starting_at(10_000)
    }
}

impl IdSource for CounterIds {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// Addresses from the 192.168.0.0/16 range, one per call.
pub struct PrivateRangeAddresses {
    next: AtomicU64,
}

impl Default for PrivateRangeAddresses {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl AddressSource for PrivateRangeAddresses {
    fn next_address(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("192.168.{}.{}", (n >> 8) & 0xff, n & 0xff)
    }
}
