use serde::{Deserialize, Serialize};

pub const REQUEST_COLLECTION: &str = "requests";

/// Lifecycle of a note request. Fulfilled and Closed are terminal labels
/// set outside the moderation surface; moderation only moves requests in
/// and out of the bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Fulfilled,
    Closed,
    Deleted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Closed => "Closed",
            RequestStatus::Deleted => "Deleted",
        }
    }
}

/// A student's request for material nobody has uploaded yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub requested_by: String,
    pub requester_name: String,
    pub title: String,
    pub subject: String,
    pub stream: String,
    #[serde(default)]
    pub description: String,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RequestDoc {
    pub fn audit_name(&self) -> String {
        if self.title.is_empty() {
            "Unknown Request".to_string()
        } else {
            self.title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_labels() {
        for status in [
            RequestStatus::Open,
            RequestStatus::Fulfilled,
            RequestStatus::Closed,
            RequestStatus::Deleted,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: RequestStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn serializes_with_camel_case_wire_names() {
        let request = RequestDoc {
            id: None,
            requested_by: "u7".to_string(),
            requester_name: "Meena".to_string(),
            title: "DBMS previous papers".to_string(),
            subject: "DBMS".to_string(),
            stream: "btech".to_string(),
            description: String::new(),
            status: RequestStatus::Open,
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"requestedBy\":\"u7\""));
        assert!(json.contains("\"requesterName\":\"Meena\""));
        assert!(!json.contains("\"_id\""));
    }
}
