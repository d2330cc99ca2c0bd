use serde::{Deserialize, Serialize};

pub const NOTE_COLLECTION: &str = "notes";

/// Moderation lifecycle of an uploaded note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteStatus {
    Pending,
    Approved,
    Rejected,
    Deleted,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Pending => "Pending",
            NoteStatus::Approved => "Approved",
            NoteStatus::Rejected => "Rejected",
            NoteStatus::Deleted => "Deleted",
        }
    }
}

/// A study-material upload as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub subject: String,
    /// Education system the material belongs to ("AP" or "TS").
    pub state: String,
    pub stream: String,
    pub course: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    pub group_or_branch: String,
    pub semester_or_year: String,
    pub material_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    pub file_path: String,
    /// Uploader's user id. Empty for legacy rows whose uploader is unknown.
    #[serde(default)]
    pub uploaded_by: String,
    pub uploader_name: String,
    pub status: NoteStatus,
    #[serde(default)]
    pub downloads: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub reports: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl NoteDoc {
    /// Title as recorded in audit entries. Untitled rows get a placeholder
    /// so the trail never carries an empty target name.
    pub fn audit_name(&self) -> String {
        if self.title.is_empty() {
            "Unknown Note".to_string()
        } else {
            self.title.clone()
        }
    }
}
