//! Admin moderation endpoints
//!
//! All of these require the admin role. Moderation verbs are POSTs on the
//! target entity; the feeds and bin-inclusive listings are GETs.
//!
//! - `POST /api/v1/admin/notes/{id}/approve|reject|delete|restore|purge`
//! - `POST /api/v1/admin/requests/{id}/delete|restore|purge`
//! - `POST /api/v1/admin/users/{id}/toggle-status`
//! - `POST /api/v1/admin/notifications/{id}/read`
//! - `GET  /api/v1/admin/notes` / `GET /api/v1/admin/requests`
//! - `GET  /api/v1/admin/audit-logs` / `GET /api/v1/admin/notifications`

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::content::{NoteSummary, NotesResponse, RequestSummary, RequestsResponse};
use super::{
    actor_from_headers, failure_response, json_response, not_found_response, read_json_body,
    FullBody, SuccessResponse,
};
use crate::db::schemas::{AuditLogDoc, NotificationDoc};
use crate::feed;
use crate::moderation::{require_admin, ActionReceipt, NoteAction, RequestAction};
use crate::server::AppState;
use crate::types::CarrelError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurgeBody {
    /// Title the caller believes it is destroying; checked against the
    /// stored document before anything happens.
    expected_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    /// Fallback audit name for profiles that never stored one.
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub action: String,
    pub target_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

impl From<ActionReceipt> for ActionResponse {
    fn from(receipt: ActionReceipt) -> Self {
        Self {
            success: true,
            action: receipt.action.to_string(),
            target_id: receipt.target_id,
            status: receipt.new_status.map(|status| status.to_string()),
            audit_id: receipt.audit_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub admin_id: String,
    pub admin_name: String,
    pub action: String,
    pub target_id: String,
    pub target_name: String,
    pub category: String,
    pub timestamp: String,
}

impl From<AuditLogDoc> for AuditLogEntry {
    fn from(doc: AuditLogDoc) -> Self {
        Self {
            id: doc.id.unwrap_or_default(),
            admin_id: doc.admin_id,
            admin_name: doc.admin_name,
            action: doc.action,
            target_id: doc.target_id,
            target_name: doc.target_name,
            category: doc.category.as_str().to_string(),
            timestamp: doc.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub timestamp: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

impl From<NotificationDoc> for NotificationEntry {
    fn from(doc: NotificationDoc) -> Self {
        Self {
            id: doc.id.unwrap_or_default(),
            kind: doc.kind.as_str().to_string(),
            title: doc.title,
            message: doc.message,
            timestamp: doc.timestamp.to_rfc3339(),
            read: doc.read,
            related_id: doc.related_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditLogsResponse {
    logs: Vec<AuditLogEntry>,
    total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationsResponse {
    notifications: Vec<NotificationEntry>,
    total: usize,
}

pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/v1/admin").unwrap_or("").to_string();

    match (method, subpath.as_str()) {
        (Method::GET, "/notes") => list_notes(req, state).await,
        (Method::GET, "/requests") => list_requests(req, state).await,
        (Method::GET, "/audit-logs") => audit_logs(req, state).await,
        (Method::GET, "/notifications") => notifications(req, state).await,

        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/approve") => {
            let id = segment_id(p, "/notes/", "/approve");
            moderate_note(req, state, id, NoteAction::Approve).await
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/reject") => {
            let id = segment_id(p, "/notes/", "/reject");
            moderate_note(req, state, id, NoteAction::Reject).await
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/delete") => {
            let id = segment_id(p, "/notes/", "/delete");
            moderate_note(req, state, id, NoteAction::Delete).await
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/restore") => {
            let id = segment_id(p, "/notes/", "/restore");
            moderate_note(req, state, id, NoteAction::Restore).await
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/purge") => {
            let id = segment_id(p, "/notes/", "/purge");
            moderate_note(req, state, id, NoteAction::Purge).await
        }

        (Method::POST, p) if p.starts_with("/requests/") && p.ends_with("/delete") => {
            let id = segment_id(p, "/requests/", "/delete");
            moderate_request(req, state, id, RequestAction::Delete).await
        }
        (Method::POST, p) if p.starts_with("/requests/") && p.ends_with("/restore") => {
            let id = segment_id(p, "/requests/", "/restore");
            moderate_request(req, state, id, RequestAction::Restore).await
        }
        (Method::POST, p) if p.starts_with("/requests/") && p.ends_with("/purge") => {
            let id = segment_id(p, "/requests/", "/purge");
            moderate_request(req, state, id, RequestAction::Purge).await
        }

        (Method::POST, p) if p.starts_with("/users/") && p.ends_with("/toggle-status") => {
            let id = segment_id(p, "/users/", "/toggle-status");
            toggle_user(req, state, id).await
        }
        (Method::POST, p) if p.starts_with("/notifications/") && p.ends_with("/read") => {
            let id = segment_id(p, "/notifications/", "/read");
            mark_notification_read(req, state, id).await
        }

        _ => not_found_response(path),
    }
}

fn segment_id<'a>(path: &'a str, prefix: &str, suffix: &str) -> &'a str {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .unwrap_or("")
}

async fn moderate_note(
    req: Request<Incoming>,
    state: Arc<AppState>,
    note_id: &str,
    action: NoteAction,
) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    let result = match action {
        NoteAction::Approve => state.moderation.approve_note(&actor, note_id).await,
        NoteAction::Reject => state.moderation.reject_note(&actor, note_id).await,
        NoteAction::Delete => state.moderation.delete_note(&actor, note_id).await,
        NoteAction::Restore => state.moderation.restore_note(&actor, note_id).await,
        NoteAction::Purge => match read_json_body::<PurgeBody>(req).await {
            Ok(body) => {
                state
                    .moderation
                    .purge_note(&actor, note_id, &body.expected_name)
                    .await
            }
            Err(resp) => return resp,
        },
    };

    match result {
        Ok(receipt) => json_response(StatusCode::OK, &ActionResponse::from(receipt)),
        Err(err) => failure_response(&err),
    }
}

async fn moderate_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    request_id: &str,
    action: RequestAction,
) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    let result = match action {
        RequestAction::Delete => state.moderation.delete_request(&actor, request_id).await,
        RequestAction::Restore => state.moderation.restore_request(&actor, request_id).await,
        RequestAction::Purge => match read_json_body::<PurgeBody>(req).await {
            Ok(body) => {
                state
                    .moderation
                    .purge_request(&actor, request_id, &body.expected_name)
                    .await
            }
            Err(resp) => return resp,
        },
    };

    match result {
        Ok(receipt) => json_response(StatusCode::OK, &ActionResponse::from(receipt)),
        Err(err) => failure_response(&err),
    }
}

async fn toggle_user(
    req: Request<Incoming>,
    state: Arc<AppState>,
    user_id: &str,
) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    let body: ToggleBody = match read_json_body(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    match state
        .moderation
        .toggle_user_status(&actor, user_id, &body.display_name)
        .await
    {
        Ok(receipt) => json_response(StatusCode::OK, &ActionResponse::from(receipt)),
        Err(err) => failure_response(&err),
    }
}

async fn mark_notification_read(
    req: Request<Incoming>,
    state: Arc<AppState>,
    notification_id: &str,
) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    match state.content.mark_notification_read(notification_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Notification marked read".to_string(),
            },
        ),
        Err(err) => failure_response(&err),
    }
}

async fn list_notes(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    match state.content.list_notes(true).await {
        Ok(notes) => {
            let notes: Vec<NoteSummary> = notes.into_iter().map(Into::into).collect();
            json_response(
                StatusCode::OK,
                &NotesResponse {
                    total: notes.len(),
                    notes,
                },
            )
        }
        Err(err) => failure_response(&err),
    }
}

async fn list_requests(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    match state.content.list_requests(true).await {
        Ok(requests) => {
            let requests: Vec<RequestSummary> = requests.into_iter().map(Into::into).collect();
            json_response(
                StatusCode::OK,
                &RequestsResponse {
                    total: requests.len(),
                    requests,
                },
            )
        }
        Err(err) => failure_response(&err),
    }
}

async fn audit_logs(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    match feed::audit_snapshot(state.store.as_ref(), state.args.audit_feed_limit).await {
        Ok(logs) => {
            let logs: Vec<AuditLogEntry> = logs.into_iter().map(Into::into).collect();
            json_response(
                StatusCode::OK,
                &AuditLogsResponse {
                    total: logs.len(),
                    logs,
                },
            )
        }
        Err(err) => failure_response(&CarrelError::from(err)),
    }
}

async fn notifications(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let actor = match actor_from_headers(&req) {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };
    if let Err(err) = require_admin(&actor) {
        return failure_response(&err);
    }

    match feed::notification_snapshot(state.store.as_ref(), state.args.notification_feed_limit)
        .await
    {
        Ok(rows) => {
            let notifications: Vec<NotificationEntry> = rows.into_iter().map(Into::into).collect();
            json_response(
                StatusCode::OK,
                &NotificationsResponse {
                    total: notifications.len(),
                    notifications,
                },
            )
        }
        Err(err) => failure_response(&CarrelError::from(err)),
    }
}
