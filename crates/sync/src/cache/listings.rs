// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use kb_core::{ClockSource, Listing};

use super::{Cache, MemoryCache};

/// Key of the one slot holding the latest active listings.
pub const ACTIVE_LISTINGS_KEY: &str = "active_listings";

/// Default freshness window for cached listings.
pub const DEFAULT_LISTINGS_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached snapshot of active listings.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedListings {
    pub data: Vec<Listing>,
    pub timestamp_ms: u64,
}

/// The fallback snapshot of "current active listings".
///
/// There is one slot regardless of category filter: whichever query last
/// succeeded owns it.
#[derive(Clone)]
pub struct ListingCache {
    backend: Arc<dyn Cache<Vec<Listing>>>,
    ttl: Duration,
}

impl ListingCache {
    pub fn new(backend: Arc<dyn Cache<Vec<Listing>>>, ttl: Duration) -> Self {
        ListingCache { backend, ttl }
    }

    /// In-memory cache with the default TTL.
    pub fn in_memory(clock: Arc<dyn ClockSource>) -> Self {
        Self::new(Arc::new(MemoryCache::new(clock)), DEFAULT_LISTINGS_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached listings, unless missing or expired.
    pub fn get(&self) -> Option<CachedListings> {
        self.backend
            .get(ACTIVE_LISTINGS_KEY)
            .map(|entry| CachedListings {
                data: entry.data,
                timestamp_ms: entry.timestamp_ms,
            })
    }

    /// Cached listings or an empty list.
    pub fn get_or_empty(&self) -> Vec<Listing> {
        self.get().map(|cached| cached.data).unwrap_or_default()
    }

    /// Replace the slot. Last writer wins.
    pub fn put(&self, data: Vec<Listing>) {
        tracing::debug!(count = data.len(), "caching active listings");
        self.backend.put(ACTIVE_LISTINGS_KEY, data, self.ttl);
    }

    pub fn clear(&self) {
        self.backend.remove(ACTIVE_LISTINGS_KEY);
    }
}

#[cfg(test)]
#[path = "listings_tests.rs"]
mod tests;
