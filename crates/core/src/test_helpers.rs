// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for kb-core tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::listing::{Coordinates, Listing, Location, NewListing, Owner};

/// A fixed instant used as "now" across tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
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
