//! Live bounded feeds
//!
//! A feed view materializes one ordered, bounded listing and re-reads it
//! whenever a write touches its collection. Readers poll `next`; the first
//! call returns the current snapshot immediately, later calls block until
//! something relevant changes. Dropping the view tears the subscription
//! down with it.

use bson::Document;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::db::decode_rows;
use crate::db::schemas::{
    AuditLogDoc, NotificationDoc, AUDIT_LOG_COLLECTION, NOTIFICATION_COLLECTION,
};
use crate::db::store::{EntityStore, StoreError, StoreEvent, StoreQuery};

pub fn audit_query(limit: usize) -> StoreQuery {
    StoreQuery::new(AUDIT_LOG_COLLECTION)
        .order_by("timestamp")
        .with_limit(limit)
}

pub fn notification_query(limit: usize) -> StoreQuery {
    StoreQuery::new(NOTIFICATION_COLLECTION)
        .order_by("timestamp")
        .with_limit(limit)
}

/// One-shot bounded read of the audit trail, newest first.
pub async fn audit_snapshot(
    store: &dyn EntityStore,
    limit: usize,
) -> Result<Vec<AuditLogDoc>, StoreError> {
    let rows = store.list(audit_query(limit)).await?;
    Ok(decode_rows(rows))
}

/// One-shot bounded read of the notification feed, newest first.
pub async fn notification_snapshot(
    store: &dyn EntityStore,
    limit: usize,
) -> Result<Vec<NotificationDoc>, StoreError> {
    let rows = store.list(notification_query(limit)).await?;
    Ok(decode_rows(rows))
}

pub struct FeedView {
    store: Arc<dyn EntityStore>,
    query: StoreQuery,
    events: broadcast::Receiver<StoreEvent>,
    primed: bool,
    dirty: bool,
}

impl FeedView {
    pub fn open(store: Arc<dyn EntityStore>, query: StoreQuery) -> Self {
        let events = store.watch();
        Self {
            store,
            query,
            events,
            primed: false,
            dirty: false,
        }
    }

    /// Wait for the next state of the view. Writes to other collections
    /// are skipped without a re-read. A lagged subscription is treated as
    /// a change: the re-read restores a consistent view on its own.
    ///
    /// Cancel safe: once a relevant event is consumed the view is marked
    /// dirty, so a caller that drops this future mid-read still gets the
    /// update on its next call instead of waiting again.
    pub async fn next(&mut self) -> Result<Vec<Document>, StoreError> {
        if self.primed && !self.dirty {
            loop {
                match self.events.recv().await {
                    Ok(event) if event.collection == self.query.collection => break,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => {
                        return Err(StoreError::Backend(
                            "store event stream closed".to_string(),
                        ))
                    }
                }
            }
            self.dirty = true;
        }
        let rows = self.store.list(self.query.clone()).await?;
        self.primed = true;
        self.dirty = false;
        Ok(rows)
    }
}
