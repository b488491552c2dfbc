// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core listing types for the kerbside item-sharing client.
//!
//! Field names serialize in camelCase because listing documents are shared
//! with every other client of the same document store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Hours an unspotted listing stays up before the store expires it.
pub const LISTING_LIFETIME_HOURS: i64 = 48;

/// Lifecycle state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Visible and available. Initial state for new listings.
    Active,
    /// Someone picked the item up.
    Taken,
    /// Aged out. Set by the store's expiry sweep, never by this client.
    Expired,
}

impl Status {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Taken => "taken",
            Status::Expired => "expired",
        }
    }

    /// Returns true if the listing can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Taken | Status::Expired)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "taken" => Ok(Status::Taken),
            "expired" => Ok(Status::Expired),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinates { lat, lng }
    }
}

/// Where the item can be picked up. Already geocoded by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub coordinates: Coordinates,
}

/// The user who posted a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

/// One user's rating of a listing. At most one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub user_id: String,
    /// Whole stars, 1 through 5.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A comment appended to a listing's thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A shareable item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Store-assigned document id. Stripped from the stored fields by the
    /// sync layer; kept in cached and annotated copies.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Image URLs; the first one is the cover.
    #[serde(default)]
    pub images: Vec<String>,
    pub location: Location,
    #[serde(default)]
    pub is_spotted: bool,
    pub owner: Owner,
    /// Mean of `ratings`, rounded to one decimal; 0 when unrated.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub ratings: Vec<RatingEntry>,
    /// Append-only thread, oldest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set only for unspotted listings: `created_at` plus 48 hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Set only once the listing is taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taken_by: Option<String>,
}

impl Listing {
    /// The cover image, if the listing has any images.
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Returns true if `user_id` posted this listing.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.user_id == user_id
    }

    /// The rating `user_id` gave this listing, if any.
    pub fn rating_by(&self, user_id: &str) -> Option<&RatingEntry> {
        self.ratings.iter().find(|r| r.user_id == user_id)
    }
}

/// Everything the owner supplies when posting a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub location: Location,
    #[serde(default)]
    pub is_spotted: bool,
    pub owner: Owner,
}

impl NewListing {
    /// Builds the listing as it will be stored when created at `now`.
    pub fn into_listing(self, id: String, now: DateTime<Utc>) -> Listing {
        let expires_at = if self.is_spotted {
            None
        } else {
            Some(now + Duration::hours(LISTING_LIFETIME_HOURS))
        };
        Listing {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            images: self.images,
            location: self.location,
            is_spotted: self.is_spotted,
            owner: self.owner,
            rating: 0.0,
            ratings: Vec::new(),
            comments: Vec::new(),
            status: Status::Active,
            created_at: now,
            updated_at: now,
            expires_at,
            taken_by: None,
        }
    }
}

#[cfg(test)]
#[path = "listing_tests.rs"]
mod tests;
