use serde::{Deserialize, Serialize};

pub const AUDIT_LOG_COLLECTION: &str = "admin_audit_logs";

/// Broad grouping the dashboard filters the trail by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    Note,
    User,
    Request,
    System,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::Note => "Note",
            AuditCategory::User => "User",
            AuditCategory::Request => "Request",
            AuditCategory::System => "System",
        }
    }
}

/// One append-only record of a privileged action. Never updated or
/// deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub admin_id: String,
    pub admin_name: String,
    pub action: String,
    pub target_id: String,
    pub target_name: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub category: AuditCategory,
}

impl AuditLogDoc {
    pub fn new(
        admin_id: String,
        admin_name: String,
        action: &str,
        target_id: String,
        target_name: String,
        category: AuditCategory,
    ) -> Self {
        Self {
            id: None,
            admin_id,
            admin_name,
            action: action.to_string(),
            target_id,
            target_name,
            timestamp: chrono::Utc::now(),
            category,
        }
    }
}
