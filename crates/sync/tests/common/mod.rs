// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for kerbside integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use kb_core::{AnnotatedListing, Coordinates, Location, ManualClock, NewListing, Owner};
use kerbside::store::USERS;
use kerbside::{MemoryStore, SyncClient, SyncConfig};

/// Long enough for spawned tasks to drain their channels under paused time.
pub const TICK: Duration = Duration::from_millis(10);

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 2, 9, 30, 0).single().unwrap()
}

/// A client over a fresh memory store, with a manual clock and no jitter.
pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub client: SyncClient,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at(t0()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let mut config = SyncConfig::default();
        config.retry.jitter_ms = 0;
        config.cache.in_memory = true;
        let client = SyncClient::with_clock(store.clone(), config, clock.clone());
        Fixture {
            clock,
            store,
            client,
        }
    }

    pub fn add_user(&self, user_id: &str) {
        let fields = json!({"username": user_id, "itemsGiven": 0, "itemsTaken": 0})
            .as_object()
            .cloned()
            .unwrap();
        self.store.insert(USERS, user_id, fields);
    }

    pub fn counter(&self, user_id: &str, field: &str) -> i64 {
        self.store
            .document(USERS, user_id)
            .and_then(|doc| doc.get(field).and_then(Value::as_i64))
            .unwrap_or(0)
    }
}

pub fn new_listing(title: &str, owner_id: &str, category: &str) -> NewListing {
    NewListing {
        title: title.to_string(),
        description: String::new(),
        category: category.to_string(),
        images: Vec::new(),
        location: Location {
            address: "12 Canal Rd".to_string(),
            coordinates: Coordinates::new(52.3676, 4.9041),
        },
        is_spotted: false,
        owner: Owner {
            user_id: owner_id.to_string(),
            email: format!("{}@example.com", owner_id),
            username: owner_id.to_string(),
        },
    }
}

/// Observer collecting every snapshot it receives.
pub type Snapshots = Arc<Mutex<Vec<Vec<AnnotatedListing>>>>;

pub fn collector() -> (Snapshots, impl FnMut(Vec<AnnotatedListing>) + Send + 'static) {
    let snapshots: Snapshots = Arc::default();
    let sink = Arc::clone(&snapshots);
    (snapshots, move |listings| sink.lock().unwrap().push(listings))
}

pub fn last_titles(snapshots: &Snapshots) -> Vec<String> {
    snapshots
        .lock()
        .unwrap()
        .last()
        .map(|s| s.iter().map(|a| a.listing.title.clone()).collect())
        .unwrap_or_default()
}
