// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kb-core: Shared library for the kerbside item-sharing client
//!
//! This crate provides the listing data model, input validation, aggregate
//! rating math, optimistic patches and display annotation. Nothing here
//! touches the network; the `kerbside` crate builds the sync layer on top.

pub mod aggregate;
pub mod annotate;
pub mod clock;
pub mod error;
pub mod id;
pub mod listing;
pub mod optimistic;
pub mod validate;

#[cfg(test)]
mod test_helpers;

pub use annotate::{annotate, AnnotatedListing};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use listing::{
    Comment, Coordinates, Listing, Location, NewListing, Owner, RatingEntry, Status,
};
pub use optimistic::{OptimisticView, PatchId};
