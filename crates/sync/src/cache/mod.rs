// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Time-bounded local caches.
//!
//! [`Cache`] is the storage port; [`MemoryCache`] and [`FileCache`] are the
//! backends. [`ListingCache`] is the single-slot fallback every read path
//! consults when the store cannot answer.

mod file;
mod listings;
mod memory;

pub use file::{default_cache_dir, FileCache};
pub use listings::{CachedListings, ListingCache, ACTIVE_LISTINGS_KEY};
pub use memory::MemoryCache;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value plus when it was written and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp_ms: u64,
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp_ms: u64, ttl: Duration) -> Self {
        CacheEntry {
            data,
            timestamp_ms,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// An entry is expired once `ttl_ms` or more has elapsed.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) >= self.ttl_ms
    }
}

/// Keyed storage with per-entry expiry.
///
/// Backends never fail loudly: unreadable or expired entries read as absent
/// and failed writes are logged.
pub trait Cache<T>: Send + Sync {
    /// The live entry for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<CacheEntry<T>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, value: T, ttl: Duration);

    fn remove(&self, key: &str);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
