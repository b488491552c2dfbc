// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kerbside: client-side sync layer for the kerbside item-sharing app
//!
//! Wraps a remote document store with the behaviour screens rely on: a live
//! subscription to active listings with bounded reconnects, retried one-shot
//! calls, a time-bounded local cache served whenever the store cannot answer,
//! a shared connection state and the writes that keep rating aggregates and
//! user counters consistent.

pub mod cache;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod mutator;
pub mod retry;
pub mod store;
pub mod subscription;

#[cfg(test)]
mod test_helpers;

pub use cache::ListingCache;
pub use client::SyncClient;
pub use config::SyncConfig;
pub use connection::{ConnectionMonitor, ConnectionState, PlatformEvent, StatusPoller};
pub use error::{Result, SyncError};
pub use mutator::{AggregateMutator, RatingOutcome};
pub use retry::RetryExecutor;
pub use store::{DocumentStore, MemoryStore, StoreError, StoreErrorCode};
pub use subscription::{ListingObserver, Subscription, SubscriptionManager};
