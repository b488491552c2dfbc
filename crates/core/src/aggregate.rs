// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate rating math.
//!
//! A listing's `rating` is always derived from its `ratings` entries:
//! the mean of every user's stars, rounded to one decimal place.

use crate::listing::RatingEntry;

/// Round to one decimal place, halves away from zero.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of all entries rounded to one decimal, or 0 when there are none.
pub fn aggregate_rating(ratings: &[RatingEntry]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.rating)).sum();
    round_one_decimal(f64::from(sum) / ratings.len() as f64)
}

/// Replace any entry by the same user, then append `entry`.
pub fn upsert_rating(ratings: &[RatingEntry], entry: RatingEntry) -> Vec<RatingEntry> {
    let mut updated: Vec<RatingEntry> = ratings
        .iter()
        .filter(|r| r.user_id != entry.user_id)
        .cloned()
        .collect();
    updated.push(entry);
    updated
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
