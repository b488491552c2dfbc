// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-stop wiring of the sync layer around a single document store.

use std::sync::Arc;

use kb_core::validate::validate_id;
use kb_core::{annotate, AnnotatedListing, ClockSource, Coordinates, Listing, SystemClock};

use crate::cache::{FileCache, ListingCache, MemoryCache};
use crate::config::SyncConfig;
use crate::connection::{ConnectionMonitor, ConnectionState, PlatformEvent, StatusPoller};
use crate::error::Result;
use crate::mutator::AggregateMutator;
use crate::retry::RetryExecutor;
use crate::store::{decode_listing, decode_listings, DocumentStore, LISTINGS};
use crate::subscription::{active_listings_query, SubscriptionManager};

/// Shared handles for everything a screen needs: live listings, one-shot
/// reads, writes and connection status.
pub struct SyncClient {
    store: Arc<dyn DocumentStore>,
    config: SyncConfig,
    clock: Arc<dyn ClockSource>,
    monitor: Arc<ConnectionMonitor>,
    retry: Arc<RetryExecutor>,
    cache: ListingCache,
    subscriptions: SubscriptionManager,
    mutator: AggregateMutator,
}

impl SyncClient {
    /// Build a client on the system clock.
    ///
    /// Listings are cached on disk under `config.cache.dir`, or the platform
    /// cache directory when unset. `config.cache.in_memory` (or a platform
    /// without a cache directory) keeps them in memory.
    pub fn new(store: Arc<dyn DocumentStore>, config: SyncConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Build a client whose timestamps, cache expiry and labels use `clock`.
    pub fn with_clock(
        store: Arc<dyn DocumentStore>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let ttl = config.cache.listings_ttl();
        let cache = match config.cache.location() {
            Some(dir) => {
                tracing::debug!(dir = %dir.display(), "using file-backed listing cache");
                ListingCache::new(Arc::new(FileCache::new(dir, Arc::clone(&clock))), ttl)
            }
            None => {
                tracing::debug!("using in-memory listing cache");
                ListingCache::new(Arc::new(MemoryCache::new(Arc::clone(&clock))), ttl)
            }
        };
        Self::with_cache(store, config, clock, cache)
    }

    /// Build a client around an existing listing cache.
    pub fn with_cache(
        store: Arc<dyn DocumentStore>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
        cache: ListingCache,
    ) -> Self {
        let monitor = Arc::new(ConnectionMonitor::new());
        let retry = Arc::new(RetryExecutor::new(
            config.retry.clone(),
            Arc::clone(&monitor),
        ));
        let subscriptions = SubscriptionManager::new(
            Arc::clone(&store),
            cache.clone(),
            Arc::clone(&monitor),
            Arc::clone(&clock),
            &config,
        );
        let mutator = AggregateMutator::new(
            Arc::clone(&store),
            Arc::clone(&retry),
            Arc::clone(&monitor),
            Arc::clone(&clock),
        );
        SyncClient {
            store,
            config,
            clock,
            monitor,
            retry,
            cache,
            subscriptions,
            mutator,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub fn retry(&self) -> &Arc<RetryExecutor> {
        &self.retry
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn mutator(&self) -> &AggregateMutator {
        &self.mutator
    }

    /// Read the active listings once.
    ///
    /// Never fails: when the store cannot answer, the cached listings are
    /// returned instead (empty if nothing fresh is cached).
    pub async fn fetch_active_listings(&self, category: Option<&str>) -> Vec<AnnotatedListing> {
        let query = active_listings_query(category, self.config.query.limit);
        let store = self.store.as_ref();
        let listings = match self
            .retry
            .run_default("fetch_active_listings", || store.query(&query))
            .await
        {
            Ok(docs) => {
                let listings = decode_listings(&docs);
                self.cache.put(listings.clone());
                listings
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch listings, serving cached listings");
                self.cache.get_or_empty()
            }
        };
        self.annotate_all(listings)
    }

    /// Read one listing by id.
    pub async fn get_listing(&self, listing_id: &str) -> Result<Option<Listing>> {
        validate_id(listing_id, "Listing id")?;
        let store = self.store.as_ref();
        let doc = self
            .retry
            .run_default("get_listing", || store.get(LISTINGS, listing_id))
            .await?;
        match doc {
            Some(doc) => Ok(Some(decode_listing(&doc)?)),
            None => Ok(None),
        }
    }

    /// React to the platform reporting a connectivity change.
    ///
    /// The state is forced either way; coming back online also asks the
    /// store to resume networking.
    pub async fn handle_platform_event(&self, event: PlatformEvent) {
        match event {
            PlatformEvent::Offline => {
                self.monitor.set(ConnectionState::Offline);
            }
            PlatformEvent::Online => {
                self.monitor.set(ConnectionState::Online);
                if let Err(e) = self.store.enable_network().await {
                    tracing::warn!(error = %e, "failed to re-enable network");
                }
            }
        }
    }

    /// Location used for distance labels from now on.
    pub fn set_user_location(&self, location: Option<Coordinates>) {
        self.subscriptions.set_user_location(location);
    }

    /// Poll the connection state at the configured interval.
    pub fn spawn_status_poller<F>(&self, listener: F) -> StatusPoller
    where
        F: FnMut(ConnectionState) + Send + 'static,
    {
        self.monitor
            .spawn_poller(self.config.monitor.poll_interval(), listener)
    }

    fn annotate_all(&self, listings: Vec<Listing>) -> Vec<AnnotatedListing> {
        let location = self.subscriptions.user_location();
        let now = self.clock.now();
        listings
            .into_iter()
            .map(|listing| annotate(listing, location, now))
            .collect()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
