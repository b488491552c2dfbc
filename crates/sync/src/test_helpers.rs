// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for kerbside tests.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Map, Value};

use kb_core::{
    AnnotatedListing, ClockSource, Coordinates, Listing, Location, ManualClock, NewListing, Owner,
};

use crate::cache::ListingCache;
use crate::config::SyncConfig;
use crate::connection::ConnectionMonitor;
use crate::retry::RetryExecutor;
use crate::store::{encode_listing, DocumentStore, MemoryStore, StoreError, LISTINGS, USERS};
use crate::subscription::{ListingObserver, SubscriptionManager};

/// A fixed instant used as "now" across tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

pub fn make_owner(user_id: &str) -> Owner {
    Owner {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        username: user_id.to_string(),
    }
}

pub fn make_new_listing(title: &str, owner_id: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        description: "Still works".to_string(),
        category: "furniture".to_string(),
        images: vec!["https://img.example.com/cover.jpg".to_string()],
        location: Location {
            address: "1 Main St".to_string(),
            coordinates: Coordinates::new(51.5074, -0.1278),
        },
        is_spotted: false,
        owner: make_owner(owner_id),
    }
}

/// Create an active, unrated listing owned by `owner_id`, created at [`t0`].
pub fn make_listing(id: &str, owner_id: &str) -> Listing {
    make_new_listing("Armchair", owner_id).into_listing(id.to_string(), t0())
}

/// Like [`make_listing`], created `minutes` after [`t0`] in `category`.
pub fn make_listing_at(id: &str, category: &str, minutes: i64) -> Listing {
    let mut listing = make_new_listing(id, "alice")
        .into_listing(id.to_string(), t0() + Duration::minutes(minutes));
    listing.category = category.to_string();
    listing
}

pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Wiring shared by most async tests: a memory store, a manual clock pinned
/// to [`t0`], a monitor and an in-memory listing cache.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub monitor: Arc<ConnectionMonitor>,
    pub cache: ListingCache,
    pub config: SyncConfig,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at(t0()));
        let dyn_clock: Arc<dyn ClockSource> = clock.clone();
        let mut config = SyncConfig::default();
        config.retry.jitter_ms = 0;
        config.cache.in_memory = true;
        Harness {
            store: Arc::new(MemoryStore::with_clock(Arc::clone(&dyn_clock))),
            monitor: Arc::new(ConnectionMonitor::new()),
            cache: ListingCache::in_memory(dyn_clock),
            clock,
            config,
        }
    }

    pub fn clock(&self) -> Arc<dyn ClockSource> {
        self.clock.clone()
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn seed(&self, listing: &Listing) {
        self.store
            .insert(LISTINGS, &listing.id, encode_listing(listing).unwrap());
    }

    pub fn seed_user(&self, user_id: &str) {
        self.store.insert(
            USERS,
            user_id,
            fields(json!({"itemsGiven": 0, "itemsTaken": 0})),
        );
    }

    pub fn user_counter(&self, user_id: &str, field: &str) -> Option<i64> {
        self.store
            .document(USERS, user_id)
            .and_then(|doc| doc.get(field).and_then(Value::as_i64))
    }

    pub fn retry(&self) -> Arc<RetryExecutor> {
        Arc::new(RetryExecutor::new(
            self.config.retry.clone(),
            Arc::clone(&self.monitor),
        ))
    }

    pub fn manager(&self) -> SubscriptionManager {
        SubscriptionManager::new(
            self.store(),
            self.cache.clone(),
            Arc::clone(&self.monitor),
            self.clock(),
            &self.config,
        )
    }
}

/// Observer that records everything it is handed.
#[derive(Clone, Default)]
pub struct Recorder {
    snapshots: Arc<Mutex<Vec<Vec<AnnotatedListing>>>>,
    errors: Arc<Mutex<Vec<StoreError>>>,
}

impl Recorder {
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    /// Ids of the most recent snapshot, in delivery order.
    pub fn last_ids(&self) -> Vec<String> {
        self.snapshots
            .lock()
            .unwrap()
            .last()
            .map(|s| s.iter().map(|a| a.listing.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Vec<AnnotatedListing> {
        self.snapshots
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<StoreError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ListingObserver for Recorder {
    fn on_listings(&mut self, listings: Vec<AnnotatedListing>) {
        self.snapshots.lock().unwrap().push(listings);
    }

    fn on_error(&mut self, error: &StoreError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
