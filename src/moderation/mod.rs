//! Moderation workflows
//!
//! Every privileged action follows the same path: capability gate, snapshot
//! read of the target, pure transition planning, then ordered effect
//! execution through the sequencer.

pub mod actor;
pub mod engine;
pub mod sequencer;

pub use actor::{require_admin, Actor};
pub use engine::{
    note_transition, request_transition, user_toggle, Effect, NoteAction, RequestAction,
    Transition, NOTE_APPROVAL_AWARD,
};
pub use sequencer::{execute, ActionReceipt, TargetRef};

use std::sync::Arc;
use tracing::info;

use crate::db::decode;
use crate::db::schemas::{
    NoteDoc, RequestDoc, UserDoc, NOTE_COLLECTION, REQUEST_COLLECTION, USER_COLLECTION,
};
use crate::db::store::EntityStore;
use crate::types::{CarrelError, Result};

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn EntityStore>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn approve_note(&self, actor: &Actor, note_id: &str) -> Result<ActionReceipt> {
        self.run_note_action(actor, note_id, NoteAction::Approve).await
    }

    pub async fn reject_note(&self, actor: &Actor, note_id: &str) -> Result<ActionReceipt> {
        self.run_note_action(actor, note_id, NoteAction::Reject).await
    }

    pub async fn delete_note(&self, actor: &Actor, note_id: &str) -> Result<ActionReceipt> {
        self.run_note_action(actor, note_id, NoteAction::Delete).await
    }

    pub async fn restore_note(&self, actor: &Actor, note_id: &str) -> Result<ActionReceipt> {
        self.run_note_action(actor, note_id, NoteAction::Restore).await
    }

    /// Purge is irreversible, so the caller must echo the title it believes
    /// it is destroying. A mismatch means the target changed since it was
    /// displayed, and nothing is written.
    pub async fn purge_note(
        &self,
        actor: &Actor,
        note_id: &str,
        expected_name: &str,
    ) -> Result<ActionReceipt> {
        actor::require_admin(actor)?;
        let note = self.load_note(note_id).await?;
        let name = note.audit_name();
        if name != expected_name {
            return Err(CarrelError::InvalidTransition(format!(
                "purge guard mismatch for note {}: expected '{}', found '{}'",
                note_id, expected_name, name
            )));
        }
        let plan = engine::note_transition(&note, NoteAction::Purge)?;
        let target = TargetRef {
            collection: NOTE_COLLECTION,
            id: note_id.to_string(),
            name,
        };
        let receipt = sequencer::execute(self.store.as_ref(), actor, &target, plan).await?;
        info!("{} {} by admin {}", receipt.action, note_id, actor.id);
        Ok(receipt)
    }

    pub async fn delete_request(&self, actor: &Actor, request_id: &str) -> Result<ActionReceipt> {
        self.run_request_action(actor, request_id, RequestAction::Delete)
            .await
    }

    pub async fn restore_request(&self, actor: &Actor, request_id: &str) -> Result<ActionReceipt> {
        self.run_request_action(actor, request_id, RequestAction::Restore)
            .await
    }

    pub async fn purge_request(
        &self,
        actor: &Actor,
        request_id: &str,
        expected_name: &str,
    ) -> Result<ActionReceipt> {
        actor::require_admin(actor)?;
        let request = self.load_request(request_id).await?;
        let name = request.audit_name();
        if name != expected_name {
            return Err(CarrelError::InvalidTransition(format!(
                "purge guard mismatch for request {}: expected '{}', found '{}'",
                request_id, expected_name, name
            )));
        }
        let plan = engine::request_transition(&request, RequestAction::Purge)?;
        let target = TargetRef {
            collection: REQUEST_COLLECTION,
            id: request_id.to_string(),
            name,
        };
        let receipt = sequencer::execute(self.store.as_ref(), actor, &target, plan).await?;
        info!("{} {} by admin {}", receipt.action, request_id, actor.id);
        Ok(receipt)
    }

    /// Flip an account between active and blocked. `display_name` is only
    /// used for the audit entry when the stored profile has no name.
    pub async fn toggle_user_status(
        &self,
        actor: &Actor,
        user_id: &str,
        display_name: &str,
    ) -> Result<ActionReceipt> {
        actor::require_admin(actor)?;
        let user = self.load_user(user_id).await?;
        let plan = engine::user_toggle(&user);
        let name = if user.name.is_empty() {
            display_name.to_string()
        } else {
            user.name.clone()
        };
        let target = TargetRef {
            collection: USER_COLLECTION,
            id: user_id.to_string(),
            name,
        };
        let receipt = sequencer::execute(self.store.as_ref(), actor, &target, plan).await?;
        info!("{} {} by admin {}", receipt.action, user_id, actor.id);
        Ok(receipt)
    }

    async fn run_note_action(
        &self,
        actor: &Actor,
        note_id: &str,
        action: NoteAction,
    ) -> Result<ActionReceipt> {
        actor::require_admin(actor)?;
        let note = self.load_note(note_id).await?;
        let plan = engine::note_transition(&note, action)?;
        let target = TargetRef {
            collection: NOTE_COLLECTION,
            id: note_id.to_string(),
            name: note.audit_name(),
        };
        let receipt = sequencer::execute(self.store.as_ref(), actor, &target, plan).await?;
        info!("{} {} by admin {}", receipt.action, note_id, actor.id);
        Ok(receipt)
    }

    async fn run_request_action(
        &self,
        actor: &Actor,
        request_id: &str,
        action: RequestAction,
    ) -> Result<ActionReceipt> {
        actor::require_admin(actor)?;
        let request = self.load_request(request_id).await?;
        let plan = engine::request_transition(&request, action)?;
        let target = TargetRef {
            collection: REQUEST_COLLECTION,
            id: request_id.to_string(),
            name: request.audit_name(),
        };
        let receipt = sequencer::execute(self.store.as_ref(), actor, &target, plan).await?;
        info!("{} {} by admin {}", receipt.action, request_id, actor.id);
        Ok(receipt)
    }

    async fn load_note(&self, id: &str) -> Result<NoteDoc> {
        let doc = self
            .store
            .get(NOTE_COLLECTION, id)
            .await?
            .ok_or_else(|| CarrelError::NotFound(format!("note {}", id)))?;
        decode(doc)
    }

    async fn load_request(&self, id: &str) -> Result<RequestDoc> {
        let doc = self
            .store
            .get(REQUEST_COLLECTION, id)
            .await?
            .ok_or_else(|| CarrelError::NotFound(format!("request {}", id)))?;
        decode(doc)
    }

    async fn load_user(&self, id: &str) -> Result<UserDoc> {
        let doc = self
            .store
            .get(USER_COLLECTION, id)
            .await?
            .ok_or_else(|| CarrelError::NotFound(format!("user {}", id)))?;
        decode(doc)
    }
}
