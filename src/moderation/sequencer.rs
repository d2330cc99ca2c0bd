//! Ordered execution of transition effects
//!
//! The primary state write goes first; if it fails nothing else runs and
//! the whole action fails. Every secondary write is then attempted even if
//! an earlier one failed. There is no rollback: once the primary commits
//! the new state stands, and any secondary failures are reported back as a
//! partial failure for operator follow-up.

use bson::doc;
use tracing::error;

use crate::db::schemas::{AuditLogDoc, AUDIT_LOG_COLLECTION, USER_COLLECTION};
use crate::db::store::{EntityStore, StoreError};
use crate::moderation::actor::Actor;
use crate::moderation::engine::{Effect, Transition};
use crate::types::{CarrelError, FailedStep, Result};

/// The entity a transition acts on. The name is snapshotted before the
/// primary write so a purge can still be attributed afterwards.
#[derive(Debug, Clone)]
pub struct TargetRef {
    pub collection: &'static str,
    pub id: String,
    pub name: String,
}

/// What a completed action did, for response bodies and logs.
#[derive(Debug, Clone)]
pub struct ActionReceipt {
    pub target_id: String,
    pub action: &'static str,
    pub new_status: Option<&'static str>,
    pub audit_id: Option<String>,
}

pub async fn execute(
    store: &dyn EntityStore,
    actor: &Actor,
    target: &TargetRef,
    transition: Transition,
) -> Result<ActionReceipt> {
    let mut effects = transition.effects.into_iter();
    let primary = effects.next().ok_or_else(|| {
        CarrelError::InvalidTransition("transition carries no effects".to_string())
    })?;

    let new_status = match primary {
        Effect::SetStatus(status) => {
            store
                .put(target.collection, &target.id, doc! { "status": status }, true)
                .await?;
            Some(status)
        }
        Effect::Remove => {
            store.delete(target.collection, &target.id).await?;
            None
        }
        other => {
            return Err(CarrelError::InvalidTransition(format!(
                "transition must begin with a state write, not {:?}",
                other
            )))
        }
    };

    let mut action_label: &'static str = "";
    let mut audit_id = None;
    let mut failed: Vec<FailedStep> = Vec::new();

    for effect in effects {
        match effect {
            Effect::AwardPoints { user_id, delta } => {
                if let Err(e) = store
                    .atomic_increment(USER_COLLECTION, &user_id, "points", delta)
                    .await
                {
                    error!(
                        "Point award to {} failed after state write on {}: {}",
                        user_id, target.id, e
                    );
                    failed.push(FailedStep {
                        step: "point award",
                        error: e,
                    });
                }
            }
            Effect::Audit { action, category } => {
                action_label = action;
                let record = AuditLogDoc::new(
                    actor.id.clone(),
                    actor.audit_name().to_string(),
                    action,
                    target.id.clone(),
                    target.name.clone(),
                    category,
                );
                let append = match bson::to_document(&record) {
                    Ok(doc) => store.append(AUDIT_LOG_COLLECTION, doc).await,
                    Err(e) => Err(StoreError::Encoding(e.to_string())),
                };
                match append {
                    Ok(id) => audit_id = Some(id),
                    Err(e) => {
                        error!(
                            "Audit append for '{}' on {} failed: {}",
                            action, target.id, e
                        );
                        failed.push(FailedStep {
                            step: "audit append",
                            error: e,
                        });
                    }
                }
            }
            Effect::SetStatus(_) | Effect::Remove => {
                return Err(CarrelError::InvalidTransition(
                    "state write must be the first effect".to_string(),
                ));
            }
        }
    }

    if !failed.is_empty() {
        return Err(CarrelError::PartialFailure {
            action: action_label.to_string(),
            failed,
        });
    }

    Ok(ActionReceipt {
        target_id: target.id.clone(),
        action: action_label,
        new_status,
        audit_id,
    })
}
