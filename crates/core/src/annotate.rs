// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Display enrichment for listings: distance from the viewer and age.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::listing::{Coordinates, Listing};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A listing plus the labels the UI shows next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedListing {
    #[serde(flatten)]
    pub listing: Listing,
    /// Great-circle distance from the viewer, when their location is known.
    pub distance_km: Option<f64>,
    /// "350m", "2.4km" or "Unknown".
    pub distance: String,
    /// "5 minutes ago", "1 day ago", ...
    pub age: String,
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Metres under one kilometre, otherwise kilometres with one decimal.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round())
    } else {
        format!("{:.1}km", km)
    }
}

/// Relative age in the largest whole unit, never less than one minute.
pub fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let days = elapsed.num_days();
    if days >= 1 {
        return plural(days, "day");
    }
    let hours = elapsed.num_hours();
    if hours >= 1 {
        return plural(hours, "hour");
    }
    plural(elapsed.num_minutes().max(1), "minute")
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Attach distance and age labels to a listing.
pub fn annotate(
    listing: Listing,
    user_location: Option<Coordinates>,
    now: DateTime<Utc>,
) -> AnnotatedListing {
    let distance_km = user_location.map(|at| haversine_km(at, listing.location.coordinates));
    let distance = match distance_km {
        Some(km) => format_distance(km),
        None => "Unknown".to_string(),
    };
    let age = format_age(listing.created_at, now);
    AnnotatedListing {
        listing,
        distance_km,
        distance,
        age,
    }
}

#[cfg(test)]
#[path = "annotate_tests.rs"]
mod tests;
