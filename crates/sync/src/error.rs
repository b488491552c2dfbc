// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::store::StoreError;

/// All errors surfaced by the kerbside sync layer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] kb_core::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("listing not found: {listing_id}")]
    NotFound { listing_id: String },

    #[error("cannot mark your own listing as found\n  hint: only other users can take a listing")]
    CannotMarkOwnListing,

    #[error("offline: write not attempted\n  hint: retry once the connection is back")]
    Offline,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SyncError {
    /// Returns true for errors raised before any remote call was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}

/// A specialized Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
