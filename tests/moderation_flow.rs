//! End-to-end moderation flows over the in-memory store

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use std::sync::Arc;
use tokio::sync::broadcast;

use carrel::content::{ContentService, NoteSubmission, ProfileSync, RequestSubmission};
use carrel::db::schemas::{
    NoteStatus, RequestStatus, Role, AUDIT_LOG_COLLECTION, NOTE_COLLECTION,
    NOTIFICATION_COLLECTION, REQUEST_COLLECTION, USER_COLLECTION,
};
use carrel::db::store::{EntityStore, StoreError, StoreEvent, StoreQuery};
use carrel::db::MemoryStore;
use carrel::feed::{audit_snapshot, notification_snapshot};
use carrel::moderation::{Actor, ModerationService};
use carrel::types::CarrelError;

fn admin() -> Actor {
    Actor::new("a1", "Priya", Role::Admin)
}

fn services(store: Arc<dyn EntityStore>) -> (ModerationService, ContentService) {
    (
        ModerationService::new(Arc::clone(&store)),
        ContentService::new(store),
    )
}

fn note_submission(title: &str, uploaded_by: &str, uploader_name: &str) -> NoteSubmission {
    serde_json::from_value(serde_json::json!({
        "title": title,
        "subject": "Signals and Systems",
        "state": "AP",
        "stream": "btech",
        "course": "ECE",
        "groupOrBranch": "ECE",
        "semesterOrYear": "2-1",
        "materialType": "notes",
        "filePath": "uploads/sig.pdf",
        "uploadedBy": uploaded_by,
        "uploaderName": uploader_name,
    }))
    .unwrap()
}

async fn seed_user(store: &dyn EntityStore, id: &str, name: &str, points: i64) {
    let fields = doc! {
        "name": name,
        "mobileNumber": "9000000000",
        "role": "student",
        "points": points,
        "status": "active",
        "joinedAt": "2024-01-01T00:00:00Z",
        "bookmarks": [],
    };
    store.put(USER_COLLECTION, id, fields, false).await.unwrap();
}

async fn seed_deleted_note(store: &dyn EntityStore, id: &str, title: &str) {
    let fields = doc! {
        "title": title,
        "subject": "Thermodynamics",
        "state": "TS",
        "stream": "btech",
        "course": "MECH",
        "groupOrBranch": "MECH",
        "semesterOrYear": "2-2",
        "materialType": "notes",
        "filePath": "uploads/thermo.pdf",
        "uploadedBy": "u7",
        "uploaderName": "Kiran",
        "status": "Deleted",
        "createdAt": "2024-04-01T09:00:00Z",
    };
    store.put(NOTE_COLLECTION, id, fields, false).await.unwrap();
}

async fn audit_actions(store: &dyn EntityStore) -> Vec<String> {
    store
        .list(StoreQuery::new(AUDIT_LOG_COLLECTION).order_by("timestamp"))
        .await
        .unwrap()
        .iter()
        .map(|doc| doc.get_str("action").unwrap().to_string())
        .collect()
}

async fn note_status(store: &dyn EntityStore, id: &str) -> String {
    store
        .get(NOTE_COLLECTION, id)
        .await
        .unwrap()
        .unwrap()
        .get_str("status")
        .unwrap()
        .to_string()
}

async fn user_points(store: &dyn EntityStore, id: &str) -> i64 {
    store
        .get(USER_COLLECTION, id)
        .await
        .unwrap()
        .unwrap()
        .get_i64("points")
        .unwrap()
}

#[tokio::test]
async fn upload_then_approve_pays_the_uploader_once() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, content) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u42", "Ravi", 0).await;

    let note_id = content
        .upload_note(note_submission("Signals Unit 3", "u42", "Ravi"))
        .await
        .unwrap();
    assert_eq!(note_status(store.as_ref(), &note_id).await, "Pending");

    let receipt = moderation.approve_note(&admin(), &note_id).await.unwrap();
    assert_eq!(receipt.action, "Approved Material");
    assert_eq!(receipt.new_status, Some("Approved"));
    assert!(receipt.audit_id.is_some());

    assert_eq!(note_status(store.as_ref(), &note_id).await, "Approved");
    assert_eq!(user_points(store.as_ref(), "u42").await, 10);

    // Approving again keeps the status, audits again, and never re-pays.
    moderation.approve_note(&admin(), &note_id).await.unwrap();
    assert_eq!(user_points(store.as_ref(), "u42").await, 10);
    let actions = audit_actions(store.as_ref()).await;
    assert_eq!(
        actions
            .iter()
            .filter(|a| *a == "Approved Material")
            .count(),
        2
    );

    // The upload itself notified the operators.
    let notifications = notification_snapshot(store.as_ref(), 20).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].message,
        "Ravi uploaded \"Signals Unit 3\" for Signals and Systems"
    );
}

#[tokio::test]
async fn audit_entries_name_the_admin_and_the_target() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, content) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u42", "Ravi", 0).await;

    let note_id = content
        .upload_note(note_submission("Signals Unit 3", "u42", "Ravi"))
        .await
        .unwrap();
    moderation.approve_note(&admin(), &note_id).await.unwrap();

    let logs = audit_snapshot(store.as_ref(), 100).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].admin_id, "a1");
    assert_eq!(logs[0].admin_name, "Priya");
    assert_eq!(logs[0].target_id, note_id);
    assert_eq!(logs[0].target_name, "Signals Unit 3");
}

#[tokio::test]
async fn reject_bin_restore_round_trip() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, content) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u42", "Ravi", 0).await;

    let note_id = content
        .upload_note(note_submission("Signals Unit 3", "u42", "Ravi"))
        .await
        .unwrap();
    content.report_note(&note_id, "Meena").await.unwrap();

    moderation.reject_note(&admin(), &note_id).await.unwrap();
    assert_eq!(note_status(store.as_ref(), &note_id).await, "Rejected");

    moderation.delete_note(&admin(), &note_id).await.unwrap();
    assert_eq!(note_status(store.as_ref(), &note_id).await, "Deleted");

    // Restore always lands on Approved, even though the note entered the
    // bin from Rejected. The uploader is still never paid: the award
    // belongs to the Pending -> Approved edge only.
    moderation.restore_note(&admin(), &note_id).await.unwrap();
    assert_eq!(note_status(store.as_ref(), &note_id).await, "Approved");
    assert_eq!(user_points(store.as_ref(), "u42").await, 0);

    let actions = audit_actions(store.as_ref()).await;
    assert_eq!(actions.len(), 3);
    for expected in ["Rejected Material", "Moved Material to Bin", "Restored Material"] {
        assert!(actions.iter().any(|a| a == expected), "missing {}", expected);
    }

    // Reports fan out to the operators but are not privileged actions.
    let notifications = notification_snapshot(store.as_ref(), 20).await.unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.message == "Meena reported \"Signals Unit 3\" for review."));
}

#[tokio::test]
async fn deleted_notes_refuse_ordinary_moderation() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, _) = services(Arc::clone(&store));
    seed_deleted_note(store.as_ref(), "n1", "Thermo Notes").await;

    for result in [
        moderation.approve_note(&admin(), "n1").await,
        moderation.reject_note(&admin(), "n1").await,
        moderation.delete_note(&admin(), "n1").await,
    ] {
        assert!(matches!(result, Err(CarrelError::InvalidTransition(_))));
    }
    // Nothing was audited for the refused attempts.
    assert!(audit_actions(store.as_ref()).await.is_empty());
}

#[tokio::test]
async fn purge_is_guarded_and_irreversible() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, _) = services(Arc::clone(&store));
    seed_deleted_note(store.as_ref(), "n1", "Thermo Notes").await;

    let err = moderation
        .purge_note(&admin(), "n1", "Wrong Title")
        .await
        .unwrap_err();
    assert!(matches!(err, CarrelError::InvalidTransition(_)));
    assert!(store.get(NOTE_COLLECTION, "n1").await.unwrap().is_some());

    moderation
        .purge_note(&admin(), "n1", "Thermo Notes")
        .await
        .unwrap();
    assert!(store.get(NOTE_COLLECTION, "n1").await.unwrap().is_none());

    let logs = audit_snapshot(store.as_ref(), 100).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "PERMANENTLY Deleted Material");
    assert_eq!(logs[0].target_name, "Thermo Notes");

    // The document is gone; a second purge has nothing to destroy.
    let err = moderation
        .purge_note(&admin(), "n1", "Thermo Notes")
        .await
        .unwrap_err();
    assert!(matches!(err, CarrelError::NotFound(_)));
}

#[tokio::test]
async fn request_lifecycle_mirrors_the_note_bin() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, content) = services(Arc::clone(&store));

    let submission: RequestSubmission = serde_json::from_value(serde_json::json!({
        "requestedBy": "u7",
        "requesterName": "Meena",
        "title": "DBMS previous papers",
        "subject": "DBMS",
        "stream": "btech",
    }))
    .unwrap();
    let request_id = content.post_request(submission).await.unwrap();

    let stored = store
        .get(REQUEST_COLLECTION, &request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "Open");

    moderation
        .delete_request(&admin(), &request_id)
        .await
        .unwrap();
    moderation
        .restore_request(&admin(), &request_id)
        .await
        .unwrap();
    let stored = store
        .get(REQUEST_COLLECTION, &request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "Open");

    moderation
        .delete_request(&admin(), &request_id)
        .await
        .unwrap();
    let err = moderation
        .purge_request(&admin(), &request_id, "Something Else")
        .await
        .unwrap_err();
    assert!(matches!(err, CarrelError::InvalidTransition(_)));

    moderation
        .purge_request(&admin(), &request_id, "DBMS previous papers")
        .await
        .unwrap();
    assert!(store
        .get(REQUEST_COLLECTION, &request_id)
        .await
        .unwrap()
        .is_none());

    let actions = audit_actions(store.as_ref()).await;
    assert_eq!(actions.len(), 4);
    for expected in [
        "Moved Request to Bin",
        "Restored Request",
        "PERMANENTLY Deleted Request",
    ] {
        assert!(actions.iter().any(|a| a == expected), "missing {}", expected);
    }

    let notifications = notification_snapshot(store.as_ref(), 20).await.unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.message == "Meena requested notes for DBMS"));
}

#[tokio::test]
async fn toggling_a_user_audits_each_flip() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, content) = services(Arc::clone(&store));

    content
        .sync_user_profile(ProfileSync {
            id: "u1".to_string(),
            name: "Ravi".to_string(),
            mobile_number: "9000000001".to_string(),
            email: None,
        })
        .await
        .unwrap();

    let receipt = moderation
        .toggle_user_status(&admin(), "u1", "")
        .await
        .unwrap();
    assert_eq!(receipt.action, "Suspended User");
    let stored = store.get(USER_COLLECTION, "u1").await.unwrap().unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "blocked");

    let receipt = moderation
        .toggle_user_status(&admin(), "u1", "")
        .await
        .unwrap();
    assert_eq!(receipt.action, "Activated User");
    let stored = store.get(USER_COLLECTION, "u1").await.unwrap().unwrap();
    assert_eq!(stored.get_str("status").unwrap(), "active");

    let logs = audit_snapshot(store.as_ref(), 100).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.target_name == "Ravi"));
}

#[tokio::test]
async fn toggle_audit_falls_back_to_the_display_name() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, _) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u9", "", 0).await;

    moderation
        .toggle_user_status(&admin(), "u9", "Ravi K")
        .await
        .unwrap();

    let logs = audit_snapshot(store.as_ref(), 100).await.unwrap();
    assert_eq!(logs[0].target_name, "Ravi K");
}

#[tokio::test]
async fn students_cannot_moderate() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (moderation, _) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u1", "Ravi", 0).await;
    seed_deleted_note(store.as_ref(), "n1", "Thermo Notes").await;

    let student = Actor::new("u1", "Ravi", Role::Student);
    assert!(matches!(
        moderation.toggle_user_status(&student, "u1", "").await,
        Err(CarrelError::PermissionDenied(_))
    ));
    assert!(matches!(
        moderation.purge_note(&student, "n1", "Thermo Notes").await,
        Err(CarrelError::PermissionDenied(_))
    ));

    // Denied attempts leave no trace in the trail.
    assert!(audit_actions(store.as_ref()).await.is_empty());
    assert!(store.get(NOTE_COLLECTION, "n1").await.unwrap().is_some());
}

/// Store wrapper that rejects appends to one collection, for driving the
/// partial-failure path.
struct FailingStore {
    inner: MemoryStore,
    fail_appends_to: &'static str,
}

impl FailingStore {
    fn new(fail_appends_to: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_appends_to,
        }
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.inner.put(collection, id, fields, merge).await
    }

    async fn append(&self, collection: &str, fields: Document) -> Result<String, StoreError> {
        if collection == self.fail_appends_to {
            return Err(StoreError::Backend("injected append failure".to_string()));
        }
        self.inner.append(collection, fields).await
    }

    async fn atomic_increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        self.inner.atomic_increment(collection, id, field, delta).await
    }

    async fn add_to_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError> {
        self.inner.add_to_set(collection, id, field, value).await
    }

    async fn pull_from_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Bson,
    ) -> Result<(), StoreError> {
        self.inner.pull_from_set(collection, id, field, value).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn list(&self, query: StoreQuery) -> Result<Vec<Document>, StoreError> {
        self.inner.list(query).await
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.watch()
    }

    fn backend(&self) -> &'static str {
        self.inner.backend()
    }
}

#[tokio::test]
async fn approval_survives_a_lost_audit_append() {
    let store: Arc<dyn EntityStore> = Arc::new(FailingStore::new(AUDIT_LOG_COLLECTION));
    let (moderation, content) = services(Arc::clone(&store));
    seed_user(store.as_ref(), "u42", "Ravi", 0).await;

    let note_id = content
        .upload_note(note_submission("Signals Unit 3", "u42", "Ravi"))
        .await
        .unwrap();

    let err = moderation.approve_note(&admin(), &note_id).await.unwrap_err();
    match err {
        CarrelError::PartialFailure { action, failed } => {
            assert_eq!(action, "Approved Material");
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].step, "audit append");
        }
        other => panic!("expected partial failure, got {:?}", other),
    }

    // The approval and the point award both stand.
    assert_eq!(note_status(store.as_ref(), &note_id).await, "Approved");
    assert_eq!(user_points(store.as_ref(), "u42").await, 10);
}

#[tokio::test]
async fn upload_survives_a_lost_notification_append() {
    let store: Arc<dyn EntityStore> = Arc::new(FailingStore::new(NOTIFICATION_COLLECTION));
    let (_, content) = services(Arc::clone(&store));

    let err = content
        .upload_note(note_submission("Signals Unit 3", "u42", "Ravi"))
        .await
        .unwrap_err();
    match err {
        CarrelError::PartialFailure { failed, .. } => {
            assert_eq!(failed[0].step, "notification append");
        }
        other => panic!("expected partial failure, got {:?}", other),
    }

    // The note itself was stored in Pending despite the lost fan-out.
    let notes = content.list_notes(true).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].status, NoteStatus::Pending);
    assert_eq!(notes[0].title, "Signals Unit 3");
}

#[tokio::test]
async fn request_status_labels_survive_the_round_trip() {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let (_, content) = services(Arc::clone(&store));

    let submission: RequestSubmission = serde_json::from_value(serde_json::json!({
        "requesterName": "Meena",
        "title": "DBMS previous papers",
        "subject": "DBMS",
        "stream": "btech",
    }))
    .unwrap();
    let request_id = content.post_request(submission).await.unwrap();

    let requests = content.list_requests(false).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, RequestStatus::Open);
    assert_eq!(requests[0].id.as_deref(), Some(request_id.as_str()));
    assert_eq!(requests[0].requested_by, "");
}
