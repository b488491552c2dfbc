// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Prefix shared by every listing document id.
pub const LISTING_ID_PREFIX: &str = "lst";

/// Derive a listing id from its owner, title and creation time.
/// Format: lst-{hash} where hash is the first 12 hex chars of
/// SHA256(owner + title + timestamp)
pub fn listing_id(owner_id: &str, title: &str, created_at: &DateTime<Utc>) -> String {
    let input = format!("{}\u{1f}{}\u{1f}{}", owner_id, title, created_at.to_rfc3339());
    let hash = Sha256::digest(input.as_bytes());
    format!("{}-{}", LISTING_ID_PREFIX, hex::encode(&hash[..6]))
}

/// Return `base`, or `base-2`, `base-3`, ... for the first candidate that
/// `taken` does not claim.
pub fn first_free<F>(base: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    (1u32..)
        .map(|n| match n {
            1 => base.to_string(),
            n => format!("{}-{}", base, n),
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
