// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live subscription to active listings.
//!
//! Each subscription is driven by one spawned task that owns the snapshot
//! stream, so observer calls are strictly ordered. On stream errors the
//! observer is handed the cached snapshot and the task schedules a bounded
//! series of reconnects with exponential backoff.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use kb_core::{annotate, AnnotatedListing, ClockSource, Coordinates, Listing, Status};

use crate::cache::ListingCache;
use crate::config::{ReconnectConfig, SyncConfig};
use crate::connection::{ConnectionMonitor, ConnectionState};
use crate::store::{
    decode_listings, Direction, Document, DocumentStore, Query, StoreError, LISTINGS,
};

/// Receives listing snapshots from a subscription.
pub trait ListingObserver: Send {
    /// A new snapshot, annotated for display.
    fn on_listings(&mut self, listings: Vec<AnnotatedListing>);

    /// The subscription stopped on a fatal error. Called after the cached
    /// listings have been delivered.
    fn on_error(&mut self, _error: &StoreError) {}
}

impl<F> ListingObserver for F
where
    F: FnMut(Vec<AnnotatedListing>) + Send,
{
    fn on_listings(&mut self, listings: Vec<AnnotatedListing>) {
        self(listings)
    }
}

type SharedObserver = Arc<Mutex<Box<dyn ListingObserver>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The active listings query: newest first, optionally one category.
pub fn active_listings_query(category: Option<&str>, limit: usize) -> Query {
    let mut query = Query::collection(LISTINGS).where_eq("status", Status::Active.as_str());
    if let Some(category) = category {
        query = query.where_eq("category", category);
    }
    query
        .order_by("createdAt", Direction::Descending)
        .limit(limit)
}

/// Handle to a live subscription.
///
/// Unsubscribing (or dropping the handle) takes effect immediately: no
/// further reconnect fires and the stream is detached. A subscription
/// rejected by the store ends on its own and reports inactive.
#[must_use = "dropping a Subscription cancels it"]
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    category: Option<String>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Everything the driving task needs, cheap to clone.
#[derive(Clone)]
struct Context {
    store: Arc<dyn DocumentStore>,
    cache: ListingCache,
    monitor: Arc<ConnectionMonitor>,
    clock: Arc<dyn ClockSource>,
    location: Arc<Mutex<Option<Coordinates>>>,
    reconnect: ReconnectConfig,
}

impl Context {
    fn emit(&self, listings: Vec<Listing>, observer: &SharedObserver) {
        let location = *lock(&self.location);
        let now = self.clock.now();
        let annotated = listings
            .into_iter()
            .map(|listing| annotate(listing, location, now))
            .collect();
        lock(observer).on_listings(annotated);
    }

    fn emit_cached(&self, observer: &SharedObserver) {
        self.emit(self.cache.get_or_empty(), observer);
    }

    fn deliver_snapshot(&self, docs: Vec<Document>, observer: &SharedObserver) {
        let listings = decode_listings(&docs);
        self.monitor.set(ConnectionState::Online);
        self.cache.put(listings.clone());
        self.emit(listings, observer);
    }

    /// A reconnect is already scheduled: serve the cache and let it run.
    fn on_error_while_pending(&self, err: &StoreError, observer: &SharedObserver) {
        tracing::debug!(error = %err, "listings subscription error, reconnect already pending");
        self.emit_cached(observer);
    }

    /// Serve the cache and decide when to reconnect, if at all.
    ///
    /// Only called with no reconnect pending, so each scheduled attempt is
    /// one that will actually be issued.
    fn on_transient(
        &self,
        err: &StoreError,
        attempts: &mut u32,
        observer: &SharedObserver,
    ) -> Option<Instant> {
        tracing::warn!(error = %err, "listings subscription error, serving cached listings");
        self.emit_cached(observer);

        if *attempts >= self.reconnect.max_attempts {
            self.monitor.set(ConnectionState::Offline);
            tracing::warn!(attempts = *attempts, "reconnect attempts exhausted");
            return None;
        }

        *attempts += 1;
        let delay = self.reconnect.delay(*attempts);
        self.monitor.set(ConnectionState::Reconnecting);
        tracing::debug!(
            attempt = *attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        Some(Instant::now() + delay)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive one subscription until it is cancelled or stops on its own.
async fn drive(ctx: Context, query: Query, observer: SharedObserver, cancel: CancellationToken) {
    let mut stream = ctx.store.listen(&query);
    let mut closed = false;
    let mut attempts = 0u32;
    let mut reconnect_at: Option<Instant> = None;

    loop {
        if closed && reconnect_at.is_none() {
            tracing::debug!("listings stream closed, subscription stopped");
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = stream.next(), if !closed => match event {
                Some(Ok(docs)) => {
                    attempts = 0;
                    reconnect_at = None;
                    ctx.deliver_snapshot(docs, &observer);
                }
                Some(Err(err)) if err.is_auth_failure() => {
                    tracing::warn!(error = %err, "listings subscription rejected");
                    ctx.emit_cached(&observer);
                    lock(&observer).on_error(&err);
                    cancel.cancel();
                    break;
                }
                Some(Err(err)) => {
                    if reconnect_at.is_some() {
                        ctx.on_error_while_pending(&err, &observer);
                    } else {
                        reconnect_at = ctx.on_transient(&err, &mut attempts, &observer);
                    }
                }
                None => {
                    closed = true;
                    // An error delivered just before the close already scheduled one
                    if reconnect_at.is_none() {
                        let err = StoreError::unavailable("snapshot stream closed");
                        reconnect_at = ctx.on_transient(&err, &mut attempts, &observer);
                    }
                }
            },
            _ = wait_until(reconnect_at) => {
                reconnect_at = None;
                if cancel.is_cancelled() {
                    break;
                }
                tracing::info!(attempt = attempts, "reconnecting listings subscription");
                if let Err(e) = ctx.store.enable_network().await {
                    tracing::warn!(error = %e, "failed to re-enable network");
                }
                if closed && !cancel.is_cancelled() {
                    stream = ctx.store.listen(&query);
                    closed = false;
                }
            }
        }
    }
}

struct Active {
    cancel: CancellationToken,
    category: Option<String>,
    observer: SharedObserver,
    task: JoinHandle<()>,
}

impl Active {
    async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Owns the single live listings subscription.
pub struct SubscriptionManager {
    ctx: Context,
    limit: usize,
    current: Mutex<Option<Active>>,
}

impl SubscriptionManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: ListingCache,
        monitor: Arc<ConnectionMonitor>,
        clock: Arc<dyn ClockSource>,
        config: &SyncConfig,
    ) -> Self {
        SubscriptionManager {
            ctx: Context {
                store,
                cache,
                monitor,
                clock,
                location: Arc::new(Mutex::new(None)),
                reconnect: config.reconnect.clone(),
            },
            limit: config.query.limit,
            current: Mutex::new(None),
        }
    }

    /// Start streaming active listings to `observer`.
    ///
    /// Any previous subscription is fully torn down first. Must be called
    /// from within a tokio runtime.
    pub async fn subscribe<O>(&self, category: Option<String>, observer: O) -> Subscription
    where
        O: ListingObserver + 'static,
    {
        let observer: SharedObserver = Arc::new(Mutex::new(Box::new(observer)));
        self.teardown().await;
        self.start(category, observer)
    }

    /// Re-subscribe the current observer with a new category filter.
    ///
    /// Returns `None` if there is no live subscription.
    pub async fn set_category(&self, category: Option<String>) -> Option<Subscription> {
        let previous = lock(&self.current).take()?;
        if previous.cancel.is_cancelled() {
            let _ = previous.task.await;
            return None;
        }
        let observer = Arc::clone(&previous.observer);
        previous.shutdown().await;
        Some(self.start(category, observer))
    }

    /// Cancel the live subscription and wait for its task to exit.
    pub async fn unsubscribe(&self) {
        self.teardown().await;
    }

    /// Location used for distance labels on subsequent snapshots.
    pub fn set_user_location(&self, location: Option<Coordinates>) {
        *lock(&self.ctx.location) = location;
    }

    pub fn user_location(&self) -> Option<Coordinates> {
        *lock(&self.ctx.location)
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.current)
            .as_ref()
            .is_some_and(|active| !active.cancel.is_cancelled())
    }

    /// Category filter of the live subscription, if any.
    pub fn category(&self) -> Option<String> {
        lock(&self.current)
            .as_ref()
            .filter(|active| !active.cancel.is_cancelled())
            .and_then(|active| active.category.clone())
    }

    async fn teardown(&self) {
        let previous = lock(&self.current).take();
        if let Some(previous) = previous {
            previous.shutdown().await;
        }
    }

    fn start(&self, category: Option<String>, observer: SharedObserver) -> Subscription {
        let query = active_listings_query(category.as_deref(), self.limit);
        let cancel = CancellationToken::new();
        tracing::debug!(category = ?category, "subscribing to active listings");

        let task = tokio::spawn(drive(
            self.ctx.clone(),
            query,
            Arc::clone(&observer),
            cancel.clone(),
        ));

        let active = Active {
            cancel: cancel.clone(),
            category: category.clone(),
            observer,
            task,
        };
        if let Some(stale) = lock(&self.current).replace(active) {
            stale.cancel.cancel();
        }

        Subscription { cancel, category }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.current).take() {
            active.cancel.cancel();
        }
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
