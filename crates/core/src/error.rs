// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for kb-core operations.

use thiserror::Error;

/// All possible errors that can occur in kb-core operations.
///
/// Every variant here is a validation failure: it is raised before any
/// remote call is attempted and is never worth retrying.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{field} is required")]
    FieldRequired { field: &'static str },

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("{field} too long ({actual} chars, max {max})")]
    FieldTooLong {
        field: &'static str,
        actual: usize,
        max: usize,
    },

    #[error("invalid rating: {0}\n  hint: ratings are whole numbers from 1 to 5")]
    InvalidRating(u8),

    #[error("too many images ({actual}, max {max})")]
    TooManyImages { actual: usize, max: usize },

    #[error("invalid status: '{0}'\n  hint: valid statuses are: active, taken, expired")]
    InvalidStatus(String),
}

/// A specialized Result type for kb-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
