// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Writes that change listing aggregates and user counters.
//!
//! Every operation validates its input before touching the network, refuses
//! to run while the connection is marked offline, goes through the
//! [`RetryExecutor`] and writes all fields of one change in a single update.
//!
//! Ratings are read-modify-write without a transaction: two users rating the
//! same listing at the same moment can lose one update.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use kb_core::id;
use kb_core::optimistic::{with_found, with_rating};
use kb_core::validate::{
    validate_and_trim_comment, validate_id, validate_new_listing, validate_rating,
};
use kb_core::{ClockSource, Comment, Listing, NewListing, Status};

use crate::connection::ConnectionMonitor;
use crate::error::{Result, SyncError};
use crate::retry::RetryExecutor;
use crate::store::{
    decode_listing, encode_listing, DocumentStore, FieldWrite, StoreError, StoreErrorCode,
    LISTINGS, USERS,
};

/// Counter on a user document bumped when that user posts a listing.
pub const ITEMS_GIVEN: &str = "itemsGiven";
/// Counter on a user document bumped when that user takes a listing.
pub const ITEMS_TAKEN: &str = "itemsTaken";

/// Result of [`AggregateMutator::add_rating`].
#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    /// The listing as written.
    pub listing: Listing,
    /// True if the user had rated this listing before.
    pub replaced: bool,
}

/// Performs listing writes on behalf of the current user.
pub struct AggregateMutator {
    store: Arc<dyn DocumentStore>,
    retry: Arc<RetryExecutor>,
    monitor: Arc<ConnectionMonitor>,
    clock: Arc<dyn ClockSource>,
    side_effects: TaskTracker,
}

impl AggregateMutator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        retry: Arc<RetryExecutor>,
        monitor: Arc<ConnectionMonitor>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        AggregateMutator {
            store,
            retry,
            monitor,
            clock,
            side_effects: TaskTracker::new(),
        }
    }

    /// Rate a listing 1 to 5 stars, replacing any earlier rating by the same
    /// user, and recompute the aggregate.
    pub async fn add_rating(
        &self,
        listing_id: &str,
        user_id: &str,
        value: u8,
        comment: Option<&str>,
    ) -> Result<RatingOutcome> {
        validate_id(listing_id, "Listing id")?;
        validate_id(user_id, "User id")?;
        validate_rating(value)?;
        let comment = match comment.map(str::trim).filter(|c| !c.is_empty()) {
            Some(text) => Some(validate_and_trim_comment(text)?),
            None => None,
        };
        self.ensure_online()?;

        let listing = self.fetch_listing(listing_id).await?;
        let replaced = listing.rating_by(user_id).is_some();
        let patched = with_rating(&listing, user_id, value, comment, self.clock.now());

        let writes = vec![
            FieldWrite::set("ratings", serde_json::to_value(&patched.ratings)?),
            FieldWrite::set("rating", patched.rating),
            FieldWrite::server_timestamp("updatedAt"),
        ];
        self.update_listing("add_rating", listing_id, writes).await?;

        tracing::info!(
            listing_id,
            user_id,
            rating = value,
            aggregate = patched.rating,
            "rating saved"
        );
        Ok(RatingOutcome {
            listing: patched,
            replaced,
        })
    }

    /// Append a comment to a listing's thread. Returns the stored comment.
    pub async fn add_comment(
        &self,
        listing_id: &str,
        user_id: &str,
        username: &str,
        text: &str,
        avatar: Option<&str>,
    ) -> Result<Comment> {
        validate_id(listing_id, "Listing id")?;
        validate_id(user_id, "User id")?;
        let text = validate_and_trim_comment(text)?;
        self.ensure_online()?;

        let comment = Comment {
            user_id: user_id.to_string(),
            username: username.to_string(),
            avatar: avatar.map(str::to_string),
            text,
            created_at: self.clock.now(),
        };
        let writes = vec![
            FieldWrite::array_union("comments", vec![serde_json::to_value(&comment)?]),
            FieldWrite::server_timestamp("updatedAt"),
        ];
        self.update_listing("add_comment", listing_id, writes).await?;

        tracing::info!(listing_id, user_id, "comment added");
        Ok(comment)
    }

    /// Overwrite a listing's status.
    pub async fn update_status(&self, listing_id: &str, status: Status) -> Result<()> {
        validate_id(listing_id, "Listing id")?;
        self.ensure_online()?;

        let writes = vec![
            FieldWrite::set("status", status.as_str()),
            FieldWrite::server_timestamp("updatedAt"),
        ];
        self.update_listing("update_status", listing_id, writes).await?;

        tracing::info!(listing_id, status = %status, "status updated");
        Ok(())
    }

    /// Mark someone else's listing as taken by `user_id`.
    ///
    /// Also bumps the taker's `itemsTaken` counter in the background; a
    /// failed increment is logged and never fails this call.
    pub async fn mark_as_found(
        &self,
        listing_id: &str,
        user_id: &str,
        mark_as_spotted: bool,
    ) -> Result<Listing> {
        validate_id(listing_id, "Listing id")?;
        validate_id(user_id, "User id")?;
        self.ensure_online()?;

        let listing = self.fetch_listing(listing_id).await?;
        if listing.is_owned_by(user_id) {
            return Err(SyncError::CannotMarkOwnListing);
        }

        let writes = vec![
            FieldWrite::set("status", Status::Taken.as_str()),
            FieldWrite::set("takenBy", user_id),
            FieldWrite::set("isSpotted", mark_as_spotted),
            FieldWrite::server_timestamp("updatedAt"),
        ];
        self.update_listing("mark_as_found", listing_id, writes).await?;
        tracing::info!(listing_id, user_id, "listing marked as found");

        self.spawn_increment(user_id, ITEMS_TAKEN);
        Ok(with_found(&listing, user_id, mark_as_spotted, self.clock.now()))
    }

    /// Post a new listing and bump the owner's `itemsGiven` counter in the
    /// background. Returns the listing with its store-assigned id.
    pub async fn create_listing(&self, mut new: NewListing) -> Result<Listing> {
        validate_new_listing(&new)?;
        self.ensure_online()?;

        new.title = new.title.trim().to_string();
        let now = self.clock.now();
        let id_hint = id::listing_id(&new.owner.user_id, &new.title, &now);
        let owner_id = new.owner.user_id.clone();
        let mut listing = new.into_listing(String::new(), now);
        let fields = encode_listing(&listing)?;

        let store = self.store.as_ref();
        listing.id = self
            .retry
            .run_default("create_listing", || {
                store.add(LISTINGS, &id_hint, fields.clone())
            })
            .await?;
        tracing::info!(listing_id = %listing.id, owner = %owner_id, "listing created");

        self.spawn_increment(&owner_id, ITEMS_GIVEN);
        Ok(listing)
    }

    /// Remove a listing by id.
    pub async fn delete_listing(&self, listing_id: &str) -> Result<()> {
        validate_id(listing_id, "Listing id")?;
        self.ensure_online()?;

        let store = self.store.as_ref();
        self.retry
            .run_default("delete_listing", || store.delete(LISTINGS, listing_id))
            .await?;
        tracing::info!(listing_id, "listing deleted");
        Ok(())
    }

    /// Wait for every background counter increment spawned so far.
    pub async fn flush_side_effects(&self) {
        self.side_effects.close();
        self.side_effects.wait().await;
        self.side_effects.reopen();
    }

    /// Number of background increments still running.
    pub fn pending_side_effects(&self) -> usize {
        self.side_effects.len()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.monitor.is_offline() {
            tracing::debug!("refusing write while offline");
            return Err(SyncError::Offline);
        }
        Ok(())
    }

    async fn fetch_listing(&self, listing_id: &str) -> Result<Listing> {
        let store = self.store.as_ref();
        let doc = self
            .retry
            .run_default("get_listing", || store.get(LISTINGS, listing_id))
            .await?
            .ok_or_else(|| SyncError::NotFound {
                listing_id: listing_id.to_string(),
            })?;
        Ok(decode_listing(&doc)?)
    }

    async fn update_listing(
        &self,
        name: &str,
        listing_id: &str,
        writes: Vec<FieldWrite>,
    ) -> Result<()> {
        let store = self.store.as_ref();
        self.retry
            .run_default(name, || store.update(LISTINGS, listing_id, writes.clone()))
            .await
            .map_err(|e| not_found_as_listing(e, listing_id))
    }

    fn spawn_increment(&self, user_id: &str, field: &'static str) {
        let store = Arc::clone(&self.store);
        let retry = Arc::clone(&self.retry);
        let user_id = user_id.to_string();

        self.side_effects.spawn(async move {
            let writes = vec![FieldWrite::increment(field, 1)];
            let result = retry
                .run_default("increment_counter", || {
                    store.update(USERS, &user_id, writes.clone())
                })
                .await;
            match result {
                Ok(()) => tracing::debug!(user_id = %user_id, field, "counter incremented"),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, field, error = %e, "counter increment failed")
                }
            }
        });
    }
}

fn not_found_as_listing(err: StoreError, listing_id: &str) -> SyncError {
    if err.code == StoreErrorCode::NotFound {
        SyncError::NotFound {
            listing_id: listing_id.to_string(),
        }
    } else {
        SyncError::Store(err)
    }
}

#[cfg(test)]
#[path = "mutator_tests.rs"]
mod tests;
