// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process document store.
//!
//! Behaves like the hosted store for everything this crate relies on (queries,
//! live listeners, atomic array-union and increment, server timestamps) and
//! adds hooks for tests: queued fault injection, per-operation call counters
//! and manual listener errors.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use kb_core::id::first_free;
use kb_core::{ClockSource, SystemClock};

use super::{
    Document, DocumentStore, FieldValue, FieldWrite, Query, SnapshotStream, StoreError,
    StoreFuture, StoreResult,
};

/// Store operations that can be counted and failed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Query,
    Listen,
    Get,
    Add,
    Update,
    Delete,
    EnableNetwork,
}

type Sender = mpsc::UnboundedSender<StoreResult<Vec<Document>>>;

struct Listener {
    query: Query,
    tx: Sender,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    listeners: Vec<Listener>,
    faults: HashMap<StoreOp, VecDeque<StoreError>>,
    calls: HashMap<StoreOp, usize>,
}

impl Inner {
    /// Count the call and pop the next injected fault, if any.
    fn begin(&mut self, op: StoreOp) -> StoreResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run_query(&self, query: &Query) -> Vec<Document> {
        let docs = self
            .collections
            .get(&query.collection)
            .into_iter()
            .flat_map(|c| c.iter())
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()));
        query.apply(docs)
    }

    /// Re-send the current result to every listener on `collection`.
    fn notify(&mut self, collection: &str) {
        self.listeners.retain(|l| !l.tx.is_closed());
        let updates: Vec<(Sender, Vec<Document>)> = self
            .listeners
            .iter()
            .filter(|l| l.query.collection == collection)
            .map(|l| (l.tx.clone(), self.run_query(&l.query)))
            .collect();
        for (tx, docs) in updates {
            let _ = tx.send(Ok(docs));
        }
    }
}

/// A [`DocumentStore`] held entirely in memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    clock: Arc<dyn ClockSource>,
}

impl MemoryStore {
    /// Create an empty store stamping server timestamps from the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping server timestamps from `clock`.
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        MemoryStore {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a document directly, bypassing faults and counters.
    pub fn insert(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        let mut inner = self.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        inner.notify(collection);
    }

    /// Read a document directly, bypassing faults and counters.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    /// Fail the next call to `op` with `error`. Calls queue up in order.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.lock().faults.entry(op).or_default().push_back(error);
    }

    /// Number of calls made to `op`, including failed ones.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn enable_network_calls(&self) -> usize {
        self.calls(StoreOp::EnableNetwork)
    }

    /// Number of attached listeners whose stream is still held.
    pub fn listener_count(&self) -> usize {
        let mut inner = self.lock();
        inner.listeners.retain(|l| !l.tx.is_closed());
        inner.listeners.len()
    }

    /// Deliver `error` to every live listener. Listeners stay attached.
    pub fn emit_listen_error(&self, error: StoreError) {
        let mut inner = self.lock();
        inner.listeners.retain(|l| !l.tx.is_closed());
        for listener in &inner.listeners {
            let _ = listener.tx.send(Err(error.clone()));
        }
    }

    /// Detach every listener, closing their streams.
    pub fn close_listeners(&self) {
        self.lock().listeners.clear();
    }

    fn server_timestamp(&self) -> Value {
        serde_json::to_value(self.clock.now()).unwrap_or(Value::Null)
    }

    fn apply_writes(&self, fields: &mut Map<String, Value>, writes: Vec<FieldWrite>) {
        for write in writes {
            match write.value {
                FieldValue::Set(value) => {
                    fields.insert(write.field, value);
                }
                FieldValue::ServerTimestamp => {
                    fields.insert(write.field, self.server_timestamp());
                }
                FieldValue::ArrayUnion(values) => {
                    let slot = fields
                        .entry(write.field)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if !slot.is_array() {
                        *slot = Value::Array(Vec::new());
                    }
                    if let Value::Array(items) = slot {
                        for value in values {
                            if !items.contains(&value) {
                                items.push(value);
                            }
                        }
                    }
                }
                FieldValue::Increment(by) => {
                    let current = fields
                        .get(&write.field)
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    fields.insert(write.field, Value::from(current.saturating_add(by)));
                }
                FieldValue::Delete => {
                    fields.remove(&write.field);
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn query<'a>(&'a self, query: &'a Query) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::Query)?;
            Ok(inner.run_query(query))
        })
    }

    fn listen(&self, query: &Query) -> SnapshotStream {
        let (tx, stream) = SnapshotStream::channel();
        let mut inner = self.lock();
        if let Err(err) = inner.begin(StoreOp::Listen) {
            let _ = tx.send(Err(err));
            return stream;
        }
        let _ = tx.send(Ok(inner.run_query(query)));
        inner.listeners.push(Listener {
            query: query.clone(),
            tx,
        });
        stream
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::Get)?;
            Ok(inner
                .collections
                .get(collection)
                .and_then(|c| c.get(id))
                .map(|fields| Document::new(id, fields.clone())))
        })
    }

    fn add<'a>(
        &'a self,
        collection: &'a str,
        id_hint: &'a str,
        fields: Map<String, Value>,
    ) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::Add)?;
            let docs = inner.collections.entry(collection.to_string()).or_default();

            let base = if id_hint.is_empty() { "doc" } else { id_hint };
            let id = first_free(base, |candidate| docs.contains_key(candidate));
            docs.insert(id.clone(), fields);
            inner.notify(collection);
            Ok(id)
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        writes: Vec<FieldWrite>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::Update)?;
            let Some(current) = inner.collections.get(collection).and_then(|c| c.get(id)) else {
                return Err(StoreError::not_found(format!(
                    "no document to update: {}/{}",
                    collection, id
                )));
            };

            // Build the new version first so a bad write never lands halfway
            let mut next = current.clone();
            self.apply_writes(&mut next, writes);
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), next);
            inner.notify(collection);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::Delete)?;
            if let Some(docs) = inner.collections.get_mut(collection) {
                docs.remove(id);
            }
            inner.notify(collection);
            Ok(())
        })
    }

    fn enable_network(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.lock();
            inner.begin(StoreOp::EnableNetwork)
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
