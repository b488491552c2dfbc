// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::{Error, Result};
use crate::listing::NewListing;

// Input length limits
pub const MAX_COMMENT_LENGTH: usize = 500;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 1_000;
pub const MAX_IMAGES_PER_LISTING: usize = 5;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Validate that an identifier was supplied
pub fn validate_id(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::FieldRequired { field });
    }
    Ok(())
}

/// Validate that a rating is a whole number of stars in range
pub fn validate_rating(value: u8) -> Result<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(Error::InvalidRating(value));
    }
    Ok(())
}

/// Validate and trim a comment, returning the text to store.
///
/// Length is counted in characters, not bytes.
pub fn validate_and_trim_comment(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::FieldEmpty { field: "Comment" });
    }
    let actual = trimmed.chars().count();
    if actual > MAX_COMMENT_LENGTH {
        return Err(Error::FieldTooLong {
            field: "Comment",
            actual,
            max: MAX_COMMENT_LENGTH,
        });
    }
    Ok(trimmed.to_string())
}

/// Validate the owner-supplied fields of a new listing
pub fn validate_new_listing(listing: &NewListing) -> Result<()> {
    let title = listing.title.trim();
    if title.is_empty() {
        return Err(Error::FieldEmpty { field: "Title" });
    }
    let title_len = title.chars().count();
    if title_len > MAX_TITLE_LENGTH {
        return Err(Error::FieldTooLong {
            field: "Title",
            actual: title_len,
            max: MAX_TITLE_LENGTH,
        });
    }
    let description_len = listing.description.chars().count();
    if description_len > MAX_DESCRIPTION_LENGTH {
        return Err(Error::FieldTooLong {
            field: "Description",
            actual: description_len,
            max: MAX_DESCRIPTION_LENGTH,
        });
    }
    if listing.category.trim().is_empty() {
        return Err(Error::FieldEmpty { field: "Category" });
    }
    if listing.images.len() > MAX_IMAGES_PER_LISTING {
        return Err(Error::TooManyImages {
            actual: listing.images.len(),
            max: MAX_IMAGES_PER_LISTING,
        });
    }
    validate_id(&listing.owner.user_id, "Owner user id")
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
