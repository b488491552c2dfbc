// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::t0;

#[test]
fn test_listing_id_shape() {
    let id = listing_id("alice", "Armchair", &t0());
    assert!(id.starts_with("lst-"));
    assert_eq!(id.len(), 16); // lst- + 12 hex chars
}

#[test]
fn test_listing_id_is_deterministic() {
    assert_eq!(
        listing_id("alice", "Armchair", &t0()),
        listing_id("alice", "Armchair", &t0())
    );
    assert_ne!(
        listing_id("alice", "Armchair", &t0()),
        listing_id("bob", "Armchair", &t0())
    );
}

#[test]
fn test_first_free_without_collision() {
    let base = listing_id("alice", "Lamp", &t0());
    assert_eq!(first_free(&base, |_| false), base);
}

#[test]
fn test_first_free_skips_taken_suffixes() {
    let base = listing_id("alice", "Lamp", &t0());
    let taken = [base.clone(), format!("{}-2", base)];

    let id = first_free(&base, |id| taken.iter().any(|t| t == id));
    assert_eq!(id, format!("{}-3", base));
}
