//! Acting identity and the admin capability gate

use crate::db::schemas::Role;
use crate::types::{CarrelError, Result};

/// Who is performing an operation. Carried alongside every privileged call
/// so the audit trail can attribute it.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// Name as recorded in audit entries, never empty.
    pub fn audit_name(&self) -> &str {
        if self.name.is_empty() {
            "Admin"
        } else {
            &self.name
        }
    }
}

/// Single chokepoint for every privileged action. Checked before any read
/// or write happens, so a denied caller learns nothing about the target.
pub fn require_admin(actor: &Actor) -> Result<()> {
    if actor.role >= Role::Admin {
        Ok(())
    } else {
        Err(CarrelError::PermissionDenied(format!(
            "role '{}' cannot perform admin actions",
            actor.role
        )))
    }
}
