//! The entity store abstraction
//!
//! Everything the platform persists lives in one of five collections of
//! identified documents. The trait covers exactly the operations the
//! services need: keyed reads and writes, append with a minted id, atomic
//! counter and set updates, ordered bounded listings, and a change signal
//! for the live feeds.

use async_trait::async_trait;
use bson::{Bson, Document};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store operation failed: {0}")]
    Backend(String),

    #[error("document {collection}/{id} does not exist")]
    Missing { collection: String, id: String },

    #[error("document encoding failed: {0}")]
    Encoding(String),
}

impl StoreError {
    pub fn missing(collection: &str, id: &str) -> Self {
        StoreError::Missing {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// An ordered, bounded listing over one collection.
#[derive(Debug, Clone)]
pub struct StoreQuery {
    pub collection: &'static str,
    pub order_by: &'static str,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            order_by: "createdAt",
            descending: true,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: &'static str) -> Self {
        self.order_by = field;
        self
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Emitted after every committed write, keyed by collection so feed
/// subscribers can ignore writes outside their scope.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub collection: String,
    pub id: String,
    pub kind: StoreEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    Put,
    Append,
    Delete,
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch one document by id. `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Write fields under a caller-chosen id. With `merge` the fields are
    /// laid over whatever exists (creating the document if absent, matching
    /// upsert semantics); without it the document is replaced wholesale.
    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Insert a new document under a freshly minted id, returned to the
    /// caller.
    async fn append(&self, collection: &str, fields: Document) -> Result<String, StoreError>;

    /// Add `delta` to a numeric field in one atomic step. Fails with
    /// [`StoreError::Missing`] when the document does not exist.
    async fn atomic_increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError>;

    /// Append `value` to an array field unless already present.
    async fn add_to_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError>;

    /// Remove every occurrence of `value` from an array field.
    async fn pull_from_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError>;

    /// Remove one document permanently. Fails with [`StoreError::Missing`]
    /// when the document does not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Run an ordered, bounded listing.
    async fn list(&self, query: StoreQuery) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to the write signal. Receivers that fall behind see a
    /// lagged error and should re-read, never assume completeness.
    fn watch(&self) -> broadcast::Receiver<StoreEvent>;

    /// Backend name for health reporting.
    fn backend(&self) -> &'static str;
}
