//! Entity store backends and the stored document schemas

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{EntityStore, StoreError, StoreEvent, StoreEventKind, StoreQuery};

use bson::Document;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::types::{CarrelError, Result};

/// Decode one stored document. A row that no longer matches its schema is
/// surfaced as a store failure, not a panic.
pub fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    bson::from_document(doc)
        .map_err(|e| CarrelError::StoreUnavailable(format!("stored document did not decode: {}", e)))
}

/// Decode a result set, logging and skipping rows that fail to decode so
/// one bad document cannot blank a whole listing.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Document>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|doc| match bson::from_document(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                error!("Skipping undecodable document: {}", e);
                None
            }
        })
        .collect()
}
