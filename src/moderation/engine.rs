//! Pure transition logic
//!
//! Maps a current entity state and a requested action to the ordered list
//! of effects the sequencer must apply. No I/O happens here; an illegal
//! pairing comes back as `InvalidTransition` before anything is written.

use crate::db::schemas::{
    AuditCategory, NoteDoc, NoteStatus, RequestDoc, RequestStatus, UserDoc, UserStatus,
};
use crate::types::{CarrelError, Result};

/// Points credited to the uploader when their note is first approved.
pub const NOTE_APPROVAL_AWARD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    Approve,
    Reject,
    Delete,
    Restore,
    Purge,
}

impl NoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteAction::Approve => "approve",
            NoteAction::Reject => "reject",
            NoteAction::Delete => "delete",
            NoteAction::Restore => "restore",
            NoteAction::Purge => "purge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Delete,
    Restore,
    Purge,
}

impl RequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestAction::Delete => "delete",
            RequestAction::Restore => "restore",
            RequestAction::Purge => "purge",
        }
    }
}

/// One step the sequencer must take, in order. The first effect of every
/// transition is the primary state write; the rest are secondaries.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the new status onto the target document.
    SetStatus(&'static str),
    /// Credit points to a user's balance.
    AwardPoints { user_id: String, delta: i64 },
    /// Remove the target document permanently.
    Remove,
    /// Append the audit record for this action.
    Audit {
        action: &'static str,
        category: AuditCategory,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub effects: Vec<Effect>,
}

pub fn note_transition(note: &NoteDoc, action: NoteAction) -> Result<Transition> {
    use NoteStatus::{Approved, Deleted, Pending, Rejected};

    let effects = match (action, note.status) {
        (NoteAction::Approve, Pending | Approved | Rejected) => {
            let mut effects = vec![Effect::SetStatus(Approved.as_str())];
            // The award binds to the Pending -> Approved edge alone, so a
            // re-approval (or a rejected note later approved) never pays
            // twice. Legacy rows without an uploader id get nothing.
            if note.status == Pending && !note.uploaded_by.is_empty() {
                effects.push(Effect::AwardPoints {
                    user_id: note.uploaded_by.clone(),
                    delta: NOTE_APPROVAL_AWARD,
                });
            }
            effects.push(Effect::Audit {
                action: "Approved Material",
                category: AuditCategory::Note,
            });
            effects
        }
        (NoteAction::Reject, Pending | Approved | Rejected) => vec![
            Effect::SetStatus(Rejected.as_str()),
            Effect::Audit {
                action: "Rejected Material",
                category: AuditCategory::Note,
            },
        ],
        (NoteAction::Delete, Pending | Approved | Rejected) => vec![
            Effect::SetStatus(Deleted.as_str()),
            Effect::Audit {
                action: "Moved Material to Bin",
                category: AuditCategory::Note,
            },
        ],
        // Restore lands on Approved regardless of the status held before
        // deletion; the pre-bin status is not preserved.
        (NoteAction::Restore, Deleted) => vec![
            Effect::SetStatus(Approved.as_str()),
            Effect::Audit {
                action: "Restored Material",
                category: AuditCategory::Note,
            },
        ],
        (NoteAction::Purge, Deleted) => vec![
            Effect::Remove,
            Effect::Audit {
                action: "PERMANENTLY Deleted Material",
                category: AuditCategory::Note,
            },
        ],
        (action, from) => {
            return Err(CarrelError::InvalidTransition(format!(
                "cannot {} a note in status {}",
                action.as_str(),
                from.as_str()
            )))
        }
    };
    Ok(Transition { effects })
}

pub fn request_transition(request: &RequestDoc, action: RequestAction) -> Result<Transition> {
    use RequestStatus::{Closed, Deleted, Fulfilled, Open};

    let effects = match (action, request.status) {
        (RequestAction::Delete, Open | Fulfilled | Closed) => vec![
            Effect::SetStatus(Deleted.as_str()),
            Effect::Audit {
                action: "Moved Request to Bin",
                category: AuditCategory::Request,
            },
        ],
        (RequestAction::Restore, Deleted) => vec![
            Effect::SetStatus(Open.as_str()),
            Effect::Audit {
                action: "Restored Request",
                category: AuditCategory::Request,
            },
        ],
        (RequestAction::Purge, Deleted) => vec![
            Effect::Remove,
            Effect::Audit {
                action: "PERMANENTLY Deleted Request",
                category: AuditCategory::Request,
            },
        ],
        (action, from) => {
            return Err(CarrelError::InvalidTransition(format!(
                "cannot {} a request in status {}",
                action.as_str(),
                from.as_str()
            )))
        }
    };
    Ok(Transition { effects })
}

/// The user toggle is total: every account is either active or blocked and
/// the action always flips it, so this cannot fail.
pub fn user_toggle(user: &UserDoc) -> Transition {
    let next = user.status.toggled();
    let action = match next {
        UserStatus::Blocked => "Suspended User",
        UserStatus::Active => "Activated User",
    };
    Transition {
        effects: vec![
            Effect::SetStatus(next.as_str()),
            Effect::Audit {
                action,
                category: AuditCategory::User,
            },
        ],
    }
}
