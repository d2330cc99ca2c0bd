//! Student-facing content endpoints
//!
//! - `POST /api/v1/notes` / `GET /api/v1/notes`
//! - `POST /api/v1/notes/{id}/report|like|download|bookmark`
//! - `POST /api/v1/requests` / `GET /api/v1/requests`
//! - `POST /api/v1/users/sync`
//!
//! No role gate here: these calls carry the student identity in their
//! payloads and the listings only ever show non-binned rows.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    failure_response, json_response, not_found_response, read_json_body, FullBody, SuccessResponse,
};
use crate::content::{NoteSubmission, ProfileSync, RequestSubmission};
use crate::db::schemas::{NoteDoc, RequestDoc};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportBody {
    reporter_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkBody {
    user_id: String,
    bookmarked: bool,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    success: bool,
    id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub state: String,
    pub stream: String,
    pub course: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    pub group_or_branch: String,
    pub semester_or_year: String,
    pub material_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    pub file_path: String,
    pub uploaded_by: String,
    pub uploader_name: String,
    pub status: String,
    pub downloads: i64,
    pub likes: i64,
    pub reports: i64,
    pub created_at: String,
    pub is_anonymous: bool,
}

impl From<NoteDoc> for NoteSummary {
    fn from(doc: NoteDoc) -> Self {
        Self {
            id: doc.id.unwrap_or_default(),
            title: doc.title,
            subject: doc.subject,
            state: doc.state,
            stream: doc.stream,
            course: doc.course,
            regulation: doc.regulation,
            board: doc.board,
            group_or_branch: doc.group_or_branch,
            semester_or_year: doc.semester_or_year,
            material_type: doc.material_type,
            university: doc.university,
            file_path: doc.file_path,
            uploaded_by: doc.uploaded_by,
            uploader_name: doc.uploader_name,
            status: doc.status.as_str().to_string(),
            downloads: doc.downloads,
            likes: doc.likes,
            reports: doc.reports,
            created_at: doc.created_at.to_rfc3339(),
            is_anonymous: doc.is_anonymous,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: String,
    pub requested_by: String,
    pub requester_name: String,
    pub title: String,
    pub subject: String,
    pub stream: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
}

impl From<RequestDoc> for RequestSummary {
    fn from(doc: RequestDoc) -> Self {
        Self {
            id: doc.id.unwrap_or_default(),
            requested_by: doc.requested_by,
            requester_name: doc.requester_name,
            title: doc.title,
            subject: doc.subject,
            stream: doc.stream,
            description: doc.description,
            status: doc.status.as_str().to_string(),
            created_at: doc.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<NoteSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RequestsResponse {
    pub requests: Vec<RequestSummary>,
    pub total: usize,
}

pub async fn handle_content_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<FullBody> {
    let method = req.method().clone();
    let subpath = path.strip_prefix("/api/v1").unwrap_or("").to_string();

    match (method, subpath.as_str()) {
        (Method::POST, "/notes") => upload_note(req, state).await,
        (Method::GET, "/notes") => list_notes(state).await,
        (Method::POST, "/requests") => post_request(req, state).await,
        (Method::GET, "/requests") => list_requests(state).await,
        (Method::POST, "/users/sync") => sync_profile(req, state).await,

        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/report") => {
            let id = note_id(p, "/report").to_string();
            report_note(req, state, &id).await
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/like") => {
            let id = note_id(p, "/like");
            match state.content.like_note(id).await {
                Ok(()) => success("Like recorded"),
                Err(err) => failure_response(&err),
            }
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/download") => {
            let id = note_id(p, "/download");
            match state.content.track_download(id).await {
                Ok(()) => success("Download recorded"),
                Err(err) => failure_response(&err),
            }
        }
        (Method::POST, p) if p.starts_with("/notes/") && p.ends_with("/bookmark") => {
            let id = note_id(p, "/bookmark").to_string();
            bookmark_note(req, state, &id).await
        }

        _ => not_found_response(path),
    }
}

fn note_id<'a>(path: &'a str, suffix: &str) -> &'a str {
    path.strip_prefix("/notes/")
        .and_then(|rest| rest.strip_suffix(suffix))
        .unwrap_or("")
}

fn success(message: &str) -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: message.to_string(),
        },
    )
}

async fn upload_note(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let submission: NoteSubmission = match read_json_body(req).await {
        Ok(submission) => submission,
        Err(resp) => return resp,
    };
    match state.content.upload_note(submission).await {
        Ok(id) => json_response(StatusCode::CREATED, &CreatedResponse { success: true, id }),
        Err(err) => failure_response(&err),
    }
}

async fn post_request(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let submission: RequestSubmission = match read_json_body(req).await {
        Ok(submission) => submission,
        Err(resp) => return resp,
    };
    match state.content.post_request(submission).await {
        Ok(id) => json_response(StatusCode::CREATED, &CreatedResponse { success: true, id }),
        Err(err) => failure_response(&err),
    }
}

async fn sync_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<FullBody> {
    let profile: ProfileSync = match read_json_body(req).await {
        Ok(profile) => profile,
        Err(resp) => return resp,
    };
    match state.content.sync_user_profile(profile).await {
        Ok(()) => success("Profile synced"),
        Err(err) => failure_response(&err),
    }
}

async fn report_note(
    req: Request<Incoming>,
    state: Arc<AppState>,
    note_id: &str,
) -> Response<FullBody> {
    let body: ReportBody = match read_json_body(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match state.content.report_note(note_id, &body.reporter_name).await {
        Ok(()) => success("Report recorded"),
        Err(err) => failure_response(&err),
    }
}

async fn bookmark_note(
    req: Request<Incoming>,
    state: Arc<AppState>,
    note_id: &str,
) -> Response<FullBody> {
    let body: BookmarkBody = match read_json_body(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match state
        .content
        .set_bookmark(&body.user_id, note_id, body.bookmarked)
        .await
    {
        Ok(()) => success(if body.bookmarked {
            "Bookmark added"
        } else {
            "Bookmark removed"
        }),
        Err(err) => failure_response(&err),
    }
}

async fn list_notes(state: Arc<AppState>) -> Response<FullBody> {
    match state.content.list_notes(false).await {
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

async fn list_requests(state: Arc<AppState>) -> Response<FullBody> {
    match state.content.list_requests(false).await {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_extraction_handles_every_verb() {
        assert_eq!(note_id("/notes/n1/report", "/report"), "n1");
        assert_eq!(note_id("/notes/n1/like", "/like"), "n1");
        assert_eq!(note_id("/notes/abc-def/download", "/download"), "abc-def");
    }

    #[test]
    fn note_summary_uses_wire_field_names() {
        let summary = NoteSummary {
            id: "n1".to_string(),
            title: "Unit 1".to_string(),
            subject: "Maths".to_string(),
            state: "AP".to_string(),
            stream: "btech".to_string(),
            course: "CSE".to_string(),
            regulation: None,
            board: None,
            group_or_branch: "CSE".to_string(),
            semester_or_year: "1-1".to_string(),
            material_type: "notes".to_string(),
            university: None,
            file_path: "uploads/x.pdf".to_string(),
            uploaded_by: "u42".to_string(),
            uploader_name: "Ravi".to_string(),
            status: "Pending".to_string(),
            downloads: 0,
            likes: 0,
            reports: 0,
            created_at: "2024-05-01T10:00:00+00:00".to_string(),
            is_anonymous: false,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"id\":\"n1\""));
        assert!(json.contains("\"semesterOrYear\":\"1-1\""));
        assert!(json.contains("\"isAnonymous\":false"));
        assert!(!json.contains("\"_id\""));
    }
}
