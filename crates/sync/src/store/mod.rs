// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote document store abstraction.
//!
//! Provides a trait-based port over the hosted document database that enables:
//! - Real backends supplied by the hosting application
//! - The in-process [`MemoryStore`] for tests and local development

mod memory;

pub use memory::{MemoryStore, StoreOp};

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use kb_core::Listing;

/// Collection holding listing documents.
pub const LISTINGS: &str = "listings";
/// Collection holding user profile documents.
pub const USERS: &str = "users";

/// Error codes reported by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    PermissionDenied,
    Unauthenticated,
    InvalidArgument,
    NotFound,
    Unavailable,
    DeadlineExceeded,
    Aborted,
    Internal,
    Unknown,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::PermissionDenied => "permission-denied",
            StoreErrorCode::Unauthenticated => "unauthenticated",
            StoreErrorCode::InvalidArgument => "invalid-argument",
            StoreErrorCode::NotFound => "not-found",
            StoreErrorCode::Unavailable => "unavailable",
            StoreErrorCode::DeadlineExceeded => "deadline-exceeded",
            StoreErrorCode::Aborted => "aborted",
            StoreErrorCode::Internal => "internal",
            StoreErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by a [`DocumentStore`] call or delivered on a snapshot stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        StoreError {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::PermissionDenied, message)
    }

    /// Errors that no amount of retrying will fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code,
            StoreErrorCode::PermissionDenied
                | StoreErrorCode::Unauthenticated
                | StoreErrorCode::InvalidArgument
        )
    }

    /// The caller lacks the credentials or rights for the request.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.code,
            StoreErrorCode::PermissionDenied | StoreErrorCode::Unauthenticated
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A stored document: its id plus its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Document {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Deserialize the fields into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Decode a listing document, filling in its id.
pub fn decode_listing(doc: &Document) -> serde_json::Result<Listing> {
    let mut listing: Listing = doc.decode()?;
    listing.id = doc.id.clone();
    Ok(listing)
}

/// Decode every listing in a result set, skipping malformed documents.
pub fn decode_listings(docs: &[Document]) -> Vec<Listing> {
    docs.iter()
        .filter_map(|doc| match decode_listing(doc) {
            Ok(listing) => Some(listing),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed listing");
                None
            }
        })
        .collect()
}

/// Encode a listing as stored fields. The id lives in the document key.
pub fn encode_listing(listing: &Listing) -> serde_json::Result<Map<String, Value>> {
    let mut fields = match serde_json::to_value(listing)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.remove("id");
    Ok(fields)
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A collection query: equality filters, one sort key, optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Query {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `fields` passes every filter.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.filters
            .iter()
            .all(|f| fields.get(&f.field) == Some(&f.value))
    }

    /// Filter, sort and truncate `docs` the way the store would.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|d| self.matches(&d.fields))
            .collect();
        if let Some(order) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Total order over field values used for sorting.
///
/// Missing and null sort first. Strings that both parse as RFC 3339
/// timestamps compare chronologically.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc)),
                _ => x.cmp(y),
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// How a single field changes in an update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Overwrite with a value.
    Set(Value),
    /// The store's own clock at commit time.
    ServerTimestamp,
    /// Append each element not already present, atomically.
    ArrayUnion(Vec<Value>),
    /// Add to a numeric field, treating a missing field as 0.
    Increment(i64),
    /// Remove the field.
    Delete,
}

/// One field write in an update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub field: String,
    pub value: FieldValue,
}

impl FieldWrite {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldWrite {
            field: field.into(),
            value: FieldValue::Set(value.into()),
        }
    }

    pub fn server_timestamp(field: impl Into<String>) -> Self {
        FieldWrite {
            field: field.into(),
            value: FieldValue::ServerTimestamp,
        }
    }

    pub fn array_union(field: impl Into<String>, values: Vec<Value>) -> Self {
        FieldWrite {
            field: field.into(),
            value: FieldValue::ArrayUnion(values),
        }
    }

    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        FieldWrite {
            field: field.into(),
            value: FieldValue::Increment(by),
        }
    }

    pub fn delete(field: impl Into<String>) -> Self {
        FieldWrite {
            field: field.into(),
            value: FieldValue::Delete,
        }
    }
}

/// A live query result stream.
///
/// Each item is a full snapshot or an error. Dropping the stream detaches the
/// listener from the store.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<StoreResult<Vec<Document>>>,
}

impl SnapshotStream {
    /// Create a stream plus the sender a store uses to feed it.
    pub fn channel() -> (mpsc::UnboundedSender<StoreResult<Vec<Document>>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, SnapshotStream { rx })
    }

    /// Wait for the next snapshot or error.
    ///
    /// Returns `None` once the store has closed the stream.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Document>>> {
        self.rx.recv().await
    }
}

/// Port over the hosted document database.
///
/// Implementations must be safe to share between the subscription task, the
/// mutator and spawned side effects.
pub trait DocumentStore: Send + Sync {
    /// One-shot query.
    fn query<'a>(&'a self, query: &'a Query) -> StoreFuture<'a, Vec<Document>>;

    /// Attach a live listener. The current result is delivered first, then
    /// a fresh snapshot after every change.
    fn listen(&self, query: &Query) -> SnapshotStream;

    /// Point read. `Ok(None)` when the document does not exist.
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>>;

    /// Create a document and return its id. `id_hint` is used unless taken.
    fn add<'a>(
        &'a self,
        collection: &'a str,
        id_hint: &'a str,
        fields: Map<String, Value>,
    ) -> StoreFuture<'a, String>;

    /// Apply every write or none of them. Fails with not-found if missing.
    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        writes: Vec<FieldWrite>,
    ) -> StoreFuture<'a, ()>;

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()>;

    /// Ask the store to re-establish its network path.
    fn enable_network(&self) -> StoreFuture<'_, ()>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
