// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kb_core::ClockSource;

use super::{Cache, CacheEntry};

/// Process-local cache backed by a mutex-guarded map.
pub struct MemoryCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn ClockSource>,
}

impl<T> MemoryCache<T> {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        MemoryCache {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send> Cache<T> for MemoryCache<T> {
    fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now_ms();
        let mut entries = self.entries();
        let expired = entries.get(key)?.is_expired(now);
        if expired {
            tracing::debug!(key, "cache entry expired");
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }

    fn put(&self, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        self.entries().insert(key.to_string(), entry);
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
