// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::store::{FieldWrite, MemoryStore, StoreOp};
use crate::test_helpers::{make_listing_at, Harness, Recorder};
use std::time::Duration;
use tokio::time::sleep;

const TICK: Duration = Duration::from_millis(10);

fn seeded() -> Harness {
    let h = Harness::new();
    h.seed(&make_listing_at("old", "furniture", 0));
    h.seed(&make_listing_at("new", "furniture", 30));
    h.seed(&make_listing_at("book", "books", 10));
    h
}

fn enable_calls(store: &MemoryStore) -> usize {
    store.enable_network_calls()
}

#[test]
fn query_shape() {
    let query = active_listings_query(Some("books"), 50);
    assert_eq!(query.collection, LISTINGS);
    assert_eq!(query.filters.len(), 2);
    assert_eq!(query.filters[0].field, "status");
    assert_eq!(query.filters[0].value, "active");
    assert_eq!(query.filters[1].field, "category");
    let order = query.order_by.unwrap();
    assert_eq!(order.field, "createdAt");
    assert_eq!(order.direction, Direction::Descending);
    assert_eq!(query.limit, Some(50));

    assert_eq!(active_listings_query(None, 50).filters.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_annotated_cached_and_ordered() {
    let h = seeded();
    h.monitor.set(ConnectionState::Reconnecting);
    let manager = h.manager();
    let rec = Recorder::default();

    let sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    assert!(sub.is_active());
    assert_eq!(rec.snapshot_count(), 1);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);
    assert_eq!(rec.last()[0].distance, "Unknown");
    assert_eq!(h.cache.get_or_empty().len(), 3);
    assert_eq!(h.monitor.get(), ConnectionState::Online);
}

#[tokio::test(start_paused = true)]
async fn category_filter_applies() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();

    let sub = manager.subscribe(Some("books".into()), rec.clone()).await;
    sleep(TICK).await;

    assert_eq!(sub.category(), Some("books"));
    assert_eq!(manager.category(), Some("books".to_string()));
    assert_eq!(rec.last_ids(), vec!["book"]);
}

#[tokio::test(start_paused = true)]
async fn writes_produce_new_snapshots() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store
        .update(LISTINGS, "new", vec![FieldWrite::set("status", "taken")])
        .await
        .unwrap();
    sleep(TICK).await;

    assert_eq!(rec.snapshot_count(), 2);
    assert_eq!(rec.last_ids(), vec!["book", "old"]);
}

#[tokio::test(start_paused = true)]
async fn user_location_labels_distance() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    let here = Coordinates::new(51.5074 + 0.0045, -0.1278);
    manager.set_user_location(Some(here));
    assert_eq!(manager.user_location(), Some(here));
    h.seed(&make_listing_at("newest", "furniture", 60));
    sleep(TICK).await;

    assert_eq!(rec.last()[0].distance, "500m");
}

#[tokio::test(start_paused = true)]
async fn transient_error_serves_cache_then_reconnects() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(TICK).await;

    assert_eq!(rec.snapshot_count(), 2);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);
    assert_eq!(h.monitor.get(), ConnectionState::Reconnecting);
    assert_eq!(enable_calls(&h.store), 0);

    sleep(Duration::from_millis(980)).await;
    assert_eq!(enable_calls(&h.store), 0);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(enable_calls(&h.store), 1);
    assert!(rec.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_error_without_cache_emits_empty() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;
    h.cache.clear();

    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(TICK).await;

    assert_eq!(rec.snapshot_count(), 2);
    assert!(rec.last().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnects_back_off_and_stop_after_five() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    for (fired, delay_ms) in [1_000u64, 2_000, 4_000, 8_000, 16_000].into_iter().enumerate() {
        h.store.emit_listen_error(StoreError::unavailable("down"));
        sleep(Duration::from_millis(delay_ms - 10)).await;
        assert_eq!(enable_calls(&h.store), fired, "before reconnect {}", fired + 1);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(enable_calls(&h.store), fired + 1, "after reconnect {}", fired + 1);
    }

    h.store.emit_listen_error(StoreError::unavailable("still down"));
    sleep(Duration::from_secs(120)).await;

    assert_eq!(enable_calls(&h.store), 5);
    assert_eq!(h.monitor.get(), ConnectionState::Offline);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);
}

#[tokio::test(start_paused = true)]
async fn burst_of_errors_shares_one_pending_reconnect() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    for _ in 0..5 {
        h.store.emit_listen_error(StoreError::unavailable("flapping"));
    }
    sleep(TICK).await;
    assert_eq!(rec.snapshot_count(), 6);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);
    assert_eq!(h.monitor.get(), ConnectionState::Reconnecting);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(enable_calls(&h.store), 1);

    // The burst used one attempt; the rest of the schedule is intact
    for (fired, delay_ms) in [2_000u64, 4_000, 8_000, 16_000].into_iter().enumerate() {
        let fired = fired + 1;
        h.store.emit_listen_error(StoreError::unavailable("down"));
        sleep(Duration::from_millis(delay_ms - 10)).await;
        assert_eq!(enable_calls(&h.store), fired);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(enable_calls(&h.store), fired + 1);
    }

    h.store.emit_listen_error(StoreError::unavailable("still down"));
    sleep(Duration::from_secs(60)).await;
    assert_eq!(enable_calls(&h.store), 5);
    assert_eq!(h.monitor.get(), ConnectionState::Offline);
}

#[tokio::test(start_paused = true)]
async fn error_during_last_reconnect_wait_keeps_it_scheduled() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    for delay_ms in [1_000u64, 2_000, 4_000, 8_000] {
        h.store.emit_listen_error(StoreError::unavailable("down"));
        sleep(Duration::from_millis(delay_ms + 10)).await;
    }
    assert_eq!(enable_calls(&h.store), 4);

    // Fifth attempt scheduled, then another error before it fires
    h.store.emit_listen_error(StoreError::unavailable("down"));
    sleep(TICK).await;
    h.store.emit_listen_error(StoreError::unavailable("down"));
    sleep(TICK).await;
    assert_eq!(h.monitor.get(), ConnectionState::Reconnecting);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);

    sleep(Duration::from_millis(16_000)).await;
    assert_eq!(enable_calls(&h.store), 5);
    assert_eq!(h.monitor.get(), ConnectionState::Reconnecting);

    h.store.emit_listen_error(StoreError::unavailable("down"));
    sleep(Duration::from_secs(60)).await;
    assert_eq!(enable_calls(&h.store), 5);
    assert_eq!(h.monitor.get(), ConnectionState::Offline);
}

#[tokio::test(start_paused = true)]
async fn snapshot_cancels_pending_reconnect_and_resets_backoff() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(enable_calls(&h.store), 1);

    // Second error would wait 2s; a snapshot arrives first
    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(TICK).await;
    h.seed(&make_listing_at("fresh", "furniture", 90));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(enable_calls(&h.store), 1);
    assert_eq!(h.monitor.get(), ConnectionState::Online);

    // Back to the first delay
    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(Duration::from_millis(1_010)).await;
    assert_eq!(enable_calls(&h.store), 2);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_is_fatal() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let sub = manager.subscribe(Some("books".into()), rec.clone()).await;
    sleep(TICK).await;
    assert_eq!(manager.category().as_deref(), Some("books"));

    h.store.emit_listen_error(StoreError::permission_denied("rules"));
    sleep(Duration::from_secs(60)).await;

    assert!(!sub.is_active());
    assert!(!manager.is_subscribed());
    assert!(manager.category().is_none());

    assert_eq!(rec.snapshot_count(), 2);
    assert_eq!(rec.last_ids(), vec!["book"]);
    assert_eq!(rec.errors().len(), 1);
    assert!(rec.errors()[0].is_auth_failure());
    assert_eq!(enable_calls(&h.store), 0);
    assert_eq!(h.store.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_prevents_pending_reconnect() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(TICK).await;
    sub.unsubscribe();
    assert!(!sub.is_active());

    sleep(Duration::from_secs(10)).await;
    assert_eq!(enable_calls(&h.store), 0);
    assert_eq!(h.store.listener_count(), 0);
    assert!(!manager.is_subscribed());
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_cancels() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store.emit_listen_error(StoreError::unavailable("blip"));
    sleep(TICK).await;
    drop(sub);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(enable_calls(&h.store), 0);
    assert_eq!(rec.snapshot_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn closed_stream_reattaches_after_reconnect() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    h.store.close_listeners();
    sleep(TICK).await;
    assert_eq!(rec.snapshot_count(), 2);
    assert_eq!(h.monitor.get(), ConnectionState::Reconnecting);

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(enable_calls(&h.store), 1);
    assert_eq!(h.store.calls(StoreOp::Listen), 2);
    assert_eq!(rec.snapshot_count(), 3);
    assert_eq!(h.monitor.get(), ConnectionState::Online);
}

#[tokio::test(start_paused = true)]
async fn failed_listen_counts_once() {
    let h = seeded();
    h.store
        .fail_next(StoreOp::Listen, StoreError::unavailable("no route"));
    let manager = h.manager();
    let rec = Recorder::default();
    let _sub = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;

    assert_eq!(rec.snapshot_count(), 1);
    assert!(rec.last().is_empty());

    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(h.store.calls(StoreOp::Listen), 2);
    assert_eq!(rec.last_ids(), vec!["new", "book", "old"]);
}

#[tokio::test(start_paused = true)]
async fn resubscribe_tears_down_previous() {
    let h = seeded();
    let manager = h.manager();
    let first = Recorder::default();
    let second = Recorder::default();

    let old = manager.subscribe(None, first.clone()).await;
    sleep(TICK).await;
    let _new = manager.subscribe(Some("books".into()), second.clone()).await;
    sleep(TICK).await;

    assert!(!old.is_active());
    assert_eq!(h.store.listener_count(), 1);

    h.seed(&make_listing_at("another", "books", 45));
    sleep(TICK).await;
    assert_eq!(first.snapshot_count(), 1);
    assert_eq!(second.last_ids(), vec!["another", "book"]);
}

#[tokio::test(start_paused = true)]
async fn set_category_reuses_observer() {
    let h = seeded();
    let manager = h.manager();
    let rec = Recorder::default();

    let old = manager.subscribe(None, rec.clone()).await;
    sleep(TICK).await;
    let new = manager.set_category(Some("books".into())).await.unwrap();
    sleep(TICK).await;

    assert!(!old.is_active());
    assert!(new.is_active());
    assert_eq!(rec.snapshot_count(), 2);
    assert_eq!(rec.last_ids(), vec!["book"]);
    assert_eq!(h.store.listener_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn set_category_without_subscription() {
    let h = seeded();
    let manager = h.manager();
    assert!(manager.set_category(Some("books".into())).await.is_none());

    let sub = manager.subscribe(None, Recorder::default()).await;
    sub.unsubscribe();
    assert!(manager.set_category(None).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn manager_unsubscribe_detaches_immediately() {
    let h = seeded();
    let manager = h.manager();
    let _sub = manager.subscribe(None, |_listings: Vec<AnnotatedListing>| {}).await;
    sleep(TICK).await;
    assert!(manager.is_subscribed());

    manager.unsubscribe().await;
    assert!(!manager.is_subscribed());
    assert_eq!(h.store.listener_count(), 0);
}
