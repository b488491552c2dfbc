// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic listing patches.
//!
//! Each `with_*` function returns the listing as it will look once the
//! matching remote write succeeds. Callers apply the result to their own view
//! right away and revert to the snapshot they held if the write fails.
//! [`OptimisticView`] packages that bookkeeping.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::aggregate::{aggregate_rating, upsert_rating};
use crate::listing::{Comment, Listing, RatingEntry, Status};

/// Listing after `user_id` rates it `value` stars.
pub fn with_rating(
    listing: &Listing,
    user_id: &str,
    value: u8,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Listing {
    let ratings = upsert_rating(
        &listing.ratings,
        RatingEntry {
            user_id: user_id.to_string(),
            rating: value,
            comment,
        },
    );
    Listing {
        rating: aggregate_rating(&ratings),
        ratings,
        updated_at: now,
        ..listing.clone()
    }
}

/// Listing after `comment` is appended to its thread.
pub fn with_comment(listing: &Listing, comment: Comment) -> Listing {
    let mut patched = listing.clone();
    patched.updated_at = comment.created_at;
    patched.comments.push(comment);
    patched
}

/// Listing after an unconditional status write.
pub fn with_status(listing: &Listing, status: Status, now: DateTime<Utc>) -> Listing {
    Listing {
        status,
        updated_at: now,
        ..listing.clone()
    }
}

/// Listing after `user_id` marks it found.
pub fn with_found(
    listing: &Listing,
    user_id: &str,
    mark_as_spotted: bool,
    now: DateTime<Utc>,
) -> Listing {
    Listing {
        status: Status::Taken,
        taken_by: Some(user_id.to_string()),
        is_spotted: mark_as_spotted,
        updated_at: now,
        ..listing.clone()
    }
}

/// Handle to a patch applied through [`OptimisticView::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(u64);

/// A caller-side list of listings with pending optimistic patches.
///
/// Each patch remembers the listing it replaced so a failed write can be
/// rolled back exactly.
#[derive(Debug, Default)]
pub struct OptimisticView {
    listings: Vec<Listing>,
    pending: HashMap<PatchId, Listing>,
    next_id: u64,
}

impl OptimisticView {
    pub fn new(listings: Vec<Listing>) -> Self {
        OptimisticView {
            listings,
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Current listings, including unconfirmed patches.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Replace the whole view, e.g. with a fresh snapshot.
    ///
    /// Pending patches are dropped: the snapshot is authoritative.
    pub fn replace(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.pending.clear();
    }

    /// Swap in `patched` for the listing with the same id.
    ///
    /// Returns `None` if the view does not contain that listing.
    pub fn apply(&mut self, patched: Listing) -> Option<PatchId> {
        let slot = self.listings.iter_mut().find(|l| l.id == patched.id)?;
        let previous = std::mem::replace(slot, patched);
        let id = PatchId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, previous);
        Some(id)
    }

    /// The remote write landed; forget the rollback snapshot.
    pub fn confirm(&mut self, id: PatchId) {
        self.pending.remove(&id);
    }

    /// The remote write failed; restore the pre-patch listing.
    pub fn revert(&mut self, id: PatchId) -> bool {
        let Some(previous) = self.pending.remove(&id) else {
            return false;
        };
        match self.listings.iter_mut().find(|l| l.id == previous.id) {
            Some(slot) => {
                *slot = previous;
                true
            }
            None => false,
        }
    }

    /// Number of patches awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[path = "optimistic_tests.rs"]
mod tests;
