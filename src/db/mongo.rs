//! MongoDB-backed entity store

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures_util::stream::StreamExt;
use mongodb::options::{FindOptions, ReplaceOptions, UpdateOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tokio::sync::broadcast;
use tracing::{error, info};

use super::schemas::{
    AUDIT_LOG_COLLECTION, NOTE_COLLECTION, NOTIFICATION_COLLECTION, REQUEST_COLLECTION,
};
use super::store::{EntityStore, StoreError, StoreEvent, StoreEventKind, StoreQuery};

pub struct MongoStore {
    db: Database,
    events: broadcast::Sender<StoreEvent>,
}

impl MongoStore {
    /// Connect, ping, and ensure the feed indexes exist. Fails fast when
    /// the server is unreachable rather than queueing operations.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        info!("Connecting to MongoDB at {}", uri);

        let uri_with_timeout = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&uri_with_timeout)
            .await
            .map_err(|e| StoreError::Connection(format!("failed to connect to MongoDB: {}", e)))?;

        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(format!("MongoDB ping failed: {}", e)))?;
        info!("Connected to MongoDB database '{}'", db_name);

        let (events, _) = broadcast::channel(256);
        let store = Self { db, events };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for (collection, keys) in index_specs() {
            let index = IndexModel::builder().keys(keys).build();
            self.collection(collection)
                .create_index(index)
                .await
                .map_err(|e| {
                    StoreError::Backend(format!("failed to create index on {}: {}", collection, e))
                })?;
        }
        Ok(())
    }

    fn notify(&self, collection: &str, id: &str, kind: StoreEventKind) {
        let _ = self.events.send(StoreEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

/// Indexes behind the ordered listings the dashboard leans on.
fn index_specs() -> Vec<(&'static str, Document)> {
    vec![
        (NOTE_COLLECTION, doc! { "createdAt": -1 }),
        (NOTE_COLLECTION, doc! { "status": 1 }),
        (REQUEST_COLLECTION, doc! { "createdAt": -1 }),
        (AUDIT_LOG_COLLECTION, doc! { "timestamp": -1 }),
        (NOTIFICATION_COLLECTION, doc! { "timestamp": -1 }),
    ]
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::Backend(format!("find_one on {} failed: {}", collection, e)))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        if merge {
            let options = UpdateOptions::builder().upsert(true).build();
            self.collection(collection)
                .update_one(doc! { "_id": id }, doc! { "$set": fields })
                .with_options(options)
                .await
                .map_err(|e| {
                    StoreError::Backend(format!("update on {} failed: {}", collection, e))
                })?;
        } else {
            let mut replacement = fields;
            replacement.insert("_id", id);
            let options = ReplaceOptions::builder().upsert(true).build();
            self.collection(collection)
                .replace_one(doc! { "_id": id }, replacement)
                .with_options(options)
                .await
                .map_err(|e| {
                    StoreError::Backend(format!("replace on {} failed: {}", collection, e))
                })?;
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn append(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut doc = fields;
        doc.insert("_id", id.clone());
        self.collection(collection)
            .insert_one(doc)
            .await
            .map_err(|e| StoreError::Backend(format!("insert on {} failed: {}", collection, e)))?;
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
        let result = self
            .collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$inc": { field: delta } })
            .await
            .map_err(|e| {
                StoreError::Backend(format!("increment on {} failed: {}", collection, e))
            })?;
        if result.matched_count == 0 {
            return Err(StoreError::missing(collection, id));
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
        let result = self
            .collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$addToSet": { field: value } })
            .await
            .map_err(|e| {
                StoreError::Backend(format!("addToSet on {} failed: {}", collection, e))
            })?;
        if result.matched_count == 0 {
            return Err(StoreError::missing(collection, id));
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
        let result = self
            .collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$pull": { field: value } })
            .await
            .map_err(|e| StoreError::Backend(format!("pull on {} failed: {}", collection, e)))?;
        if result.matched_count == 0 {
            return Err(StoreError::missing(collection, id));
        }
        self.notify(collection, id, StoreEventKind::Put);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| StoreError::Backend(format!("delete on {} failed: {}", collection, e)))?;
        if result.deleted_count == 0 {
            return Err(StoreError::missing(collection, id));
        }
        self.notify(collection, id, StoreEventKind::Delete);
        Ok(())
    }

    async fn list(&self, query: StoreQuery) -> Result<Vec<Document>, StoreError> {
        let direction = if query.descending { -1 } else { 1 };
        let mut options = FindOptions::builder()
            .sort(doc! { query.order_by: direction })
            .build();
        options.limit = query.limit.map(|limit| limit as i64);

        let cursor = self
            .collection(query.collection)
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| {
                StoreError::Backend(format!("find on {} failed: {}", query.collection, e))
            })?;

        let rows: Vec<Document> = cursor
            .filter_map(|row| async move {
                match row {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;
        Ok(rows)
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_specs_cover_every_ordered_listing() {
        let specs = index_specs();
        let ordered = [
            (NOTE_COLLECTION, "createdAt"),
            (REQUEST_COLLECTION, "createdAt"),
            (AUDIT_LOG_COLLECTION, "timestamp"),
            (NOTIFICATION_COLLECTION, "timestamp"),
        ];
        for (collection, field) in ordered {
            assert!(
                specs
                    .iter()
                    .any(|(c, keys)| *c == collection && keys.contains_key(field)),
                "no index for {}.{}",
                collection,
                field
            );
        }
    }
}
