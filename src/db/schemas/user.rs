use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const USER_COLLECTION: &str = "users";

/// Ordered platform roles. Comparisons express capability: a role may act
/// wherever `role >= required` holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Role {
    #[default]
    Visitor = 0,
    Student = 1,
    Admin = 2,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Visitor => write!(f, "visitor"),
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visitor" => Ok(Role::Visitor),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Account standing. Blocked accounts keep their data; enforcement of what
/// a blocked student may still do lives with the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
        }
    }

    pub fn toggled(&self) -> UserStatus {
        match self {
            UserStatus::Active => UserStatus::Blocked,
            UserStatus::Blocked => UserStatus::Active,
        }
    }
}

/// Contribution tier, derived from the point balance. The stored value is
/// a display cache; `Badge::for_points` is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    Bronze,
    Silver,
    Gold,
}

impl Badge {
    pub fn for_points(points: i64) -> Option<Badge> {
        match points {
            p if p >= 500 => Some(Badge::Gold),
            p if p >= 200 => Some(Badge::Silver),
            p if p >= 50 => Some(Badge::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
    pub status: UserStatus,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
}

fn default_role() -> Role {
    Role::Student
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_reflects_capability() {
        assert!(Role::Admin > Role::Student);
        assert!(Role::Student > Role::Visitor);
        assert!(Role::Admin >= Role::Admin);
    }

    #[test]
    fn role_parses_from_wire_labels() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn status_toggle_flips_both_ways() {
        assert_eq!(UserStatus::Active.toggled(), UserStatus::Blocked);
        assert_eq!(UserStatus::Blocked.toggled(), UserStatus::Active);
        assert_eq!(UserStatus::Active.toggled().toggled(), UserStatus::Active);
    }

    #[test]
    fn badge_tiers_follow_point_thresholds() {
        assert_eq!(Badge::for_points(0), None);
        assert_eq!(Badge::for_points(49), None);
        assert_eq!(Badge::for_points(50), Some(Badge::Bronze));
        assert_eq!(Badge::for_points(199), Some(Badge::Bronze));
        assert_eq!(Badge::for_points(200), Some(Badge::Silver));
        assert_eq!(Badge::for_points(499), Some(Badge::Silver));
        assert_eq!(Badge::for_points(500), Some(Badge::Gold));
        assert_eq!(Badge::for_points(5000), Some(Badge::Gold));
    }

    #[test]
    fn user_defaults_fill_sparse_documents() {
        let json = r#"{"status": "active", "joinedAt": "2024-03-01T08:00:00Z"}"#;
        let user: UserDoc = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.points, 0);
        assert!(user.bookmarks.is_empty());
    }
}
