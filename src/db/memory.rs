//! In-memory entity store
//!
//! Backs development mode and the test suite. Same observable semantics as
//! the MongoDB backend: merge/replace writes, minted append ids, atomic
//! counters, missing-document errors, and the post-write change signal.

use async_trait::async_trait;
use bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use super::store::{EntityStore, StoreError, StoreEvent, StoreEventKind, StoreQuery};

pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            collections: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn notify(&self, collection: &str, id: &str, kind: StoreEventKind) {
        let _ = self.events.send(StoreEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            let doc = docs.entry(id.to_string()).or_insert_with(Document::new);
            if !merge {
                doc.clear();
            }
            for (key, value) in fields {
                doc.insert(key, value);
            }
            doc.insert("_id", id);
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn append(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_string()).or_default();
            let mut doc = fields;
            doc.insert("_id", id.clone());
            docs.insert(id.clone(), doc);
        }
        self.notify(collection, &id, StoreEventKind::Append);
        Ok(id)
    }

    async fn atomic_increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::missing(collection, id))?;
            let current = match doc.get(field) {
                Some(Bson::Int32(v)) => i64::from(*v),
                Some(Bson::Int64(v)) => *v,
                Some(Bson::Double(v)) => *v as i64,
                _ => 0,
            };
            doc.insert(field, Bson::Int64(current + delta));
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn add_to_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::missing(collection, id))?;
            let mut values = match doc.get(field) {
                Some(Bson::Array(values)) => values.clone(),
                _ => Vec::new(),
            };
            if !values.contains(&value) {
                values.push(value);
            }
            doc.insert(field, Bson::Array(values));
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn pull_from_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::missing(collection, id))?;
            let mut values = match doc.get(field) {
                Some(Bson::Array(values)) => values.clone(),
                _ => Vec::new(),
            };
            values.retain(|existing| existing != &value);
            doc.insert(field, Bson::Array(values));
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        {
            let mut collections = self.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id))
                .ok_or_else(|| StoreError::missing(collection, id))?;
        }
        self.notify(collection, id, StoreEventKind::Delete);
        Ok(())
    }

    async fn list(&self, query: StoreQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut rows: Vec<Document> = collections
            .get(query.collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            let ord = compare_field(a, b, query.order_by);
            if query.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::Int32(x)), Some(Bson::Int32(y))) => x.cmp(y),
        (Some(Bson::Int64(x)), Some(Bson::Int64(y))) => x.cmp(y),
        (Some(Bson::Double(x)), Some(Bson::Double(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (Some(Bson::DateTime(x)), Some(Bson::DateTime(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
