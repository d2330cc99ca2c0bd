use serde::{Deserialize, Serialize};

pub const NOTIFICATION_COLLECTION: &str = "admin_notifications";

/// What kind of platform event produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NoteUpload,
    RequestPost,
    UserSignup,
    Report,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NoteUpload => "note_upload",
            NotificationKind::RequestPost => "request_post",
            NotificationKind::UserSignup => "user_signup",
            NotificationKind::Report => "report",
        }
    }
}

/// An operator-facing notification produced by fan-out after a qualifying
/// event. `read` is its only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

impl NotificationDoc {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: Option<String>,
    ) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: chrono::Utc::now(),
            read: false,
            related_id,
        }
    }
}
