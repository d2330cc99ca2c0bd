//! Platform content operations
//!
//! The student-facing write surface: uploads, requests, engagement
//! counters, bookmarks, profile sync, and the public listings the
//! moderation state machine feeds.

use bson::{doc, Bson};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::schemas::{
    Badge, NoteDoc, NoteStatus, RequestDoc, RequestStatus, Role, UserDoc, UserStatus,
    NOTE_COLLECTION, NOTIFICATION_COLLECTION, REQUEST_COLLECTION, USER_COLLECTION,
};
use crate::db::store::{EntityStore, StoreQuery};
use crate::db::{decode, decode_rows};
use crate::notify::{self, FanoutEvent};
use crate::types::{CarrelError, FailedStep, Result};

/// Upload payload as submitted by a student.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSubmission {
    pub title: String,
    pub subject: String,
    pub state: String,
    pub stream: String,
    pub course: String,
    #[serde(default)]
    pub regulation: Option<String>,
    #[serde(default)]
    pub board: Option<String>,
    pub group_or_branch: String,
    pub semester_or_year: String,
    pub material_type: String,
    #[serde(default)]
    pub university: Option<String>,
    pub file_path: String,
    #[serde(default)]
    pub uploaded_by: String,
    pub uploader_name: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSubmission {
    #[serde(default)]
    pub requested_by: String,
    pub requester_name: String,
    pub title: String,
    pub subject: String,
    pub stream: String,
    #[serde(default)]
    pub description: String,
}

/// Identity fields pushed on login. Everything else on the profile is
/// owned by this service and never supplied by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSync {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn EntityStore>,
}

impl ContentService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Store a new upload in Pending and notify the operators. The note is
    /// kept even when the notification append fails.
    pub async fn upload_note(&self, submission: NoteSubmission) -> Result<String> {
        let note = NoteDoc {
            id: None,
            title: submission.title,
            subject: submission.subject,
            state: submission.state,
            stream: submission.stream,
            course: submission.course,
            regulation: submission.regulation,
            board: submission.board,
            group_or_branch: submission.group_or_branch,
            semester_or_year: submission.semester_or_year,
            material_type: submission.material_type,
            university: submission.university,
            file_path: submission.file_path,
            uploaded_by: submission.uploaded_by,
            uploader_name: submission.uploader_name,
            status: NoteStatus::Pending,
            downloads: 0,
            likes: 0,
            reports: 0,
            created_at: Utc::now(),
            is_anonymous: submission.is_anonymous,
        };
        let doc = bson::to_document(&note)
            .map_err(|e| CarrelError::StoreUnavailable(format!("note encoding failed: {}", e)))?;
        let note_id = self.store.append(NOTE_COLLECTION, doc).await?;
        info!("Note {} uploaded by {}", note_id, note.uploader_name);

        self.fanout(
            "note upload",
            FanoutEvent::NoteUploaded {
                note_id: &note_id,
                uploader_name: &note.uploader_name,
                title: &note.title,
                subject: &note.subject,
            },
        )
        .await?;
        Ok(note_id)
    }

    /// Bump the report counter and notify the operators. The note's title
    /// is read first so the notification can quote it.
    pub async fn report_note(&self, note_id: &str, reporter_name: &str) -> Result<()> {
        let note = self.load_note(note_id).await?;
        self.store
            .atomic_increment(NOTE_COLLECTION, note_id, "reports", 1)
            .await?;
        info!("Note {} reported by {}", note_id, reporter_name);

        self.fanout(
            "note report",
            FanoutEvent::NoteReported {
                note_id,
                reporter_name,
                title: &note.title,
            },
        )
        .await
    }

    pub async fn like_note(&self, note_id: &str) -> Result<()> {
        self.store
            .atomic_increment(NOTE_COLLECTION, note_id, "likes", 1)
            .await?;
        Ok(())
    }

    pub async fn track_download(&self, note_id: &str) -> Result<()> {
        self.store
            .atomic_increment(NOTE_COLLECTION, note_id, "downloads", 1)
            .await?;
        Ok(())
    }

    pub async fn set_bookmark(&self, user_id: &str, note_id: &str, bookmarked: bool) -> Result<()> {
        let value = Bson::String(note_id.to_string());
        if bookmarked {
            self.store
                .add_to_set(USER_COLLECTION, user_id, "bookmarks", value)
                .await?;
        } else {
            self.store
                .pull_from_set(USER_COLLECTION, user_id, "bookmarks", value)
                .await?;
        }
        Ok(())
    }

    pub async fn post_request(&self, submission: RequestSubmission) -> Result<String> {
        let request = RequestDoc {
            id: None,
            requested_by: submission.requested_by,
            requester_name: submission.requester_name,
            title: submission.title,
            subject: submission.subject,
            stream: submission.stream,
            description: submission.description,
            status: RequestStatus::Open,
            created_at: Utc::now(),
        };
        let doc = bson::to_document(&request).map_err(|e| {
            CarrelError::StoreUnavailable(format!("request encoding failed: {}", e))
        })?;
        let request_id = self.store.append(REQUEST_COLLECTION, doc).await?;
        info!(
            "Request {} posted by {}",
            request_id, request.requester_name
        );

        self.fanout(
            "request post",
            FanoutEvent::RequestPosted {
                request_id: &request_id,
                requester_name: &request.requester_name,
                subject: &request.subject,
            },
        )
        .await?;
        Ok(request_id)
    }

    /// Upsert a profile on login. A first sync creates the account with
    /// platform defaults; later syncs refresh identity fields only, so
    /// points, status, and bookmarks survive every login.
    pub async fn sync_user_profile(&self, profile: ProfileSync) -> Result<()> {
        let exists = self.store.get(USER_COLLECTION, &profile.id).await?.is_some();
        let fields = if exists {
            let mut fields = doc! {
                "name": &profile.name,
                "mobileNumber": &profile.mobile_number,
            };
            if let Some(ref email) = profile.email {
                fields.insert("email", email.clone());
            }
            fields
        } else {
            let user = UserDoc {
                id: None,
                name: profile.name.clone(),
                mobile_number: profile.mobile_number.clone(),
                email: profile.email.clone(),
                role: Role::Student,
                points: 0,
                badge: Badge::for_points(0),
                status: UserStatus::Active,
                joined_at: Utc::now(),
                bookmarks: Vec::new(),
            };
            bson::to_document(&user).map_err(|e| {
                CarrelError::StoreUnavailable(format!("user encoding failed: {}", e))
            })?
        };
        self.store
            .put(USER_COLLECTION, &profile.id, fields, true)
            .await?;
        info!("User profile {} synced", profile.id);

        self.fanout(
            "profile sync",
            FanoutEvent::ProfileSynced {
                user_id: &profile.id,
                name: &profile.name,
            },
        )
        .await
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.store
            .get(NOTIFICATION_COLLECTION, notification_id)
            .await?
            .ok_or_else(|| CarrelError::NotFound(format!("notification {}", notification_id)))?;
        self.store
            .put(NOTIFICATION_COLLECTION, notification_id, doc! { "read": true }, true)
            .await?;
        Ok(())
    }

    /// Newest-first note listing. Binned rows are held back unless the
    /// caller asks for them.
    pub async fn list_notes(&self, include_deleted: bool) -> Result<Vec<NoteDoc>> {
        let rows = self
            .store
            .list(StoreQuery::new(NOTE_COLLECTION).order_by("createdAt"))
            .await?;
        let notes: Vec<NoteDoc> = decode_rows(rows);
        Ok(notes
            .into_iter()
            .filter(|note| include_deleted || note.status != NoteStatus::Deleted)
            .collect())
    }

    pub async fn list_requests(&self, include_deleted: bool) -> Result<Vec<RequestDoc>> {
        let rows = self
            .store
            .list(StoreQuery::new(REQUEST_COLLECTION).order_by("createdAt"))
            .await?;
        let requests: Vec<RequestDoc> = decode_rows(rows);
        Ok(requests
            .into_iter()
            .filter(|request| include_deleted || request.status != RequestStatus::Deleted)
            .collect())
    }

    async fn load_note(&self, id: &str) -> Result<NoteDoc> {
        let doc = self
            .store
            .get(NOTE_COLLECTION, id)
            .await?
            .ok_or_else(|| CarrelError::NotFound(format!("note {}", id)))?;
        decode(doc)
    }

    /// The triggering write is already committed when fan-out runs, so a
    /// failed append surfaces as a partial failure rather than undoing it.
    async fn fanout(&self, action: &str, event: FanoutEvent<'_>) -> Result<()> {
        if let Err(e) = notify::publish(self.store.as_ref(), event).await {
            error!("Notification fan-out failed after {}: {}", action, e);
            return Err(CarrelError::PartialFailure {
                action: action.to_string(),
                failed: vec![FailedStep {
                    step: "notification append",
                    error: e,
                }],
            });
        }
        Ok(())
    }
}
